use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::persist::FixtureCache;
use crate::prediction_api::PredictionBackend;
use crate::state::{Delta, ProviderCommand};

/// Runs every network round-trip off the UI thread, one command at a time.
/// The thread ends once every command sender is dropped.
pub fn spawn_provider<B>(
    backend: B,
    cache: Option<FixtureCache>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()>
where
    B: PredictionBackend + Send + 'static,
{
    thread::spawn(move || {
        for cmd in cmd_rx {
            let delta = handle_command(&backend, cache.as_ref(), cmd);
            if tx.send(delta).is_err() {
                break;
            }
        }
        info!("provider stopped");
    })
}

pub fn handle_command<B: PredictionBackend + ?Sized>(
    backend: &B,
    cache: Option<&FixtureCache>,
    cmd: ProviderCommand,
) -> Delta {
    match cmd {
        ProviderCommand::FetchFixtures { seq, date } => {
            let result = backend.fixtures(date).map_err(|err| format!("{err:#}"));
            if let (Ok(fixtures), Some(cache)) = (&result, cache) {
                if !fixtures.is_empty() {
                    if let Err(err) = cache.save(date, fixtures) {
                        warn!("fixtures cache write failed: {err:#}");
                    }
                }
            }
            Delta::Fixtures { seq, date, result }
        }
        ProviderCommand::FetchOdds { seq, fixture_id } => {
            let result = backend
                .odds(&fixture_id)
                .map_err(|err| format!("{err:#}"));
            Delta::Odds {
                seq,
                fixture_id,
                result,
            }
        }
        ProviderCommand::Predict { seq, request } => {
            let result = backend
                .predict(&request)
                .map_err(|err| format!("{err:#}"));
            Delta::Prediction {
                seq,
                request,
                result,
            }
        }
    }
}
