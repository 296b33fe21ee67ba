//! The send loop.
//!
//! A [`Run`] owns everything needed to emit one match worth of events: the
//! generator, the pre-sorted timestamps, the HTTP sender and the source of
//! randomness. [`Run::spin`] walks the timestamps in order, sends one event
//! per timestamp and pauses between sends. No delivery outcome stops it.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use synth_match_payload::{Roster, Schedule, Telemetry};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::{
    args::Plan,
    config::Config,
    sender::{self, Outcome, Sender},
};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Run`]
pub enum Error {
    /// Event generation or scheduling failed
    #[error(transparent)]
    Payload(#[from] synth_match_payload::Error),
    /// The sender could not be built or could not encode an event
    #[error(transparent)]
    Sender(#[from] sender::Error),
}

/// Tally of delivery outcomes for a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Answered with 200 or 201
    pub delivered: u64,
    /// Answered with any other status
    pub rejected: u64,
    /// Never answered
    pub failed: u64,
}

impl Summary {
    /// Number of events attempted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }
}

/// One match worth of events, ready to send.
#[derive(Debug)]
pub struct Run<R> {
    telemetry: Telemetry,
    timestamps: Vec<OffsetDateTime>,
    sender: Sender,
    delay: Duration,
    rng: R,
}

impl Run<StdRng> {
    /// Build a run from a validated [`Plan`] and resolved [`Config`].
    ///
    /// The roster is drawn and logged here, and the timestamp window opens at
    /// the moment of the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is not representable or the sender
    /// cannot be built from the configured endpoint.
    pub fn from_plan(plan: Plan, config: &Config) -> Result<Self, Error> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::from_seed(seed),
            None => StdRng::from_os_rng(),
        };

        let roster = Roster::new(&mut rng, plan.players)?;
        info!("Generated Player-Kart Mapping: {roster}");

        let schedule = Schedule::now(config.window())?;
        debug!(
            "Event window {start} to {end}",
            start = schedule.start(),
            end = schedule.end()
        );
        let timestamps = schedule.timestamps(&mut rng, plan.total_events);
        let sender = Sender::new(&config.endpoint, config.request_timeout())?;
        let telemetry = Telemetry::new(roster, plan.match_id, plan.track);

        Ok(Self::new(telemetry, timestamps, sender, config.delay(), rng))
    }
}

impl<R> Run<R>
where
    R: Rng,
{
    /// Create a new [`Run`] instance
    #[must_use]
    pub fn new(
        telemetry: Telemetry,
        timestamps: Vec<OffsetDateTime>,
        sender: Sender,
        delay: Duration,
        rng: R,
    ) -> Self {
        Self {
            telemetry,
            timestamps,
            sender,
            delay,
            rng,
        }
    }

    /// Send one event per timestamp, in order.
    ///
    /// Every send is followed by a pause of the configured delay, the last
    /// one included. Rejections and transport failures are logged and
    /// counted; the loop carries on regardless.
    ///
    /// # Errors
    ///
    /// Returns an error only if an event cannot be generated or encoded.
    pub async fn spin(self) -> Result<Summary, Error> {
        let Self {
            telemetry,
            timestamps,
            sender,
            delay,
            mut rng,
        } = self;
        let mut summary = Summary::default();

        for timestamp in timestamps {
            let event = telemetry.generate(&mut rng, timestamp)?;
            match sender.send(&event).await? {
                Outcome::Delivered { .. } => {
                    info!("Event sent successfully: {}", event.timestamp);
                    summary.delivered += 1;
                }
                Outcome::Rejected { status, body } => {
                    warn!("Failed to send event: {} - {body}", status.as_u16());
                    summary.rejected += 1;
                }
                Outcome::Transport(err) => {
                    error!("Error sending event: {err}");
                    summary.failed += 1;
                }
            }
            tokio::time::sleep(delay).await;
        }

        info!("All events have been processed.");
        debug!(
            "Delivered {delivered}, rejected {rejected}, failed {failed}",
            delivered = summary.delivered,
            rejected = summary.rejected,
            failed = summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::{SocketAddr, TcpListener},
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::{Duration, Instant},
    };

    use warp::Filter;

    use super::{Run, Summary};
    use crate::{
        args,
        config::{Config, Endpoint},
    };

    type Inbox = Arc<Mutex<Vec<serde_json::Value>>>;

    // Answers 200 and 500 alternately, starting with 200.
    fn flaky_server() -> (SocketAddr, Inbox) {
        let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let hits = Arc::new(AtomicUsize::new(0));
        let route = warp::post()
            .and(warp::path!("ingest" / "event"))
            .and(warp::body::json::<serde_json::Value>())
            .map(move |body: serde_json::Value| {
                sink.lock().expect("inbox lock poisoned").push(body);
                let status = if hits.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                    warp::http::StatusCode::OK
                } else {
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR
                };
                warp::reply::with_status("", status)
            });
        let (addr, serve) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve);
        (addr, inbox)
    }

    fn config(addr: SocketAddr, seed: [u8; 32]) -> Config {
        Config {
            endpoint: Endpoint {
                base_url: format!("http://{addr}"),
                table: "karts".to_string(),
                token: "t0ken".to_string(),
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            seed: Some(seed),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn three_events_two_players() {
        let (addr, inbox) = flaky_server();
        let plan = args::validate("match42:7", 3, 2).expect("valid inputs");
        let run = Run::from_plan(plan, &config(addr, [7; 32])).expect("run construction");

        let started = Instant::now();
        let summary = run.spin().await.expect("run completes");
        let elapsed = started.elapsed();

        assert_eq!(
            summary,
            Summary {
                delivered: 2,
                rejected: 1,
                failed: 0
            }
        );
        assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");

        let inbox = inbox.lock().expect("inbox lock poisoned");
        assert_eq!(inbox.len(), 3);
        for body in inbox.iter() {
            assert_eq!(body["match-id"], "match42");
            assert_eq!(body["track"], 7);
            let player = body["player-id"].as_str().expect("player id string");
            assert!(player == "player1" || player == "player2", "{player}");
        }
        let stamps: Vec<&str> = inbox
            .iter()
            .map(|body| body["timestamp"].as_str().expect("timestamp string"))
            .collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn unreachable_endpoint_still_finishes() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
            listener.local_addr().expect("local addr")
        };
        let mut config = config(addr, [1; 32]);
        config.delay_milliseconds = 1;
        let plan = args::validate("m:0", 4, 1).expect("valid inputs");

        let summary = Run::from_plan(plan, &config)
            .expect("run construction")
            .spin()
            .await
            .expect("run completes");
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.total(), 4);
    }

    #[tokio::test]
    async fn same_seed_same_events() {
        let (addr, inbox) = flaky_server();
        let mut config = config(addr, [3; 32]);
        config.delay_milliseconds = 0;

        for _ in 0..2 {
            let plan = args::validate("m:1", 5, 4).expect("valid inputs");
            Run::from_plan(plan, &config)
                .expect("run construction")
                .spin()
                .await
                .expect("run completes");
        }

        let inbox = inbox.lock().expect("inbox lock poisoned");
        assert_eq!(inbox.len(), 10);
        let strip = |body: &serde_json::Value| {
            let mut body = body.clone();
            body.as_object_mut()
                .expect("a JSON object")
                .remove("timestamp");
            body
        };
        for (first, second) in inbox[..5].iter().zip(&inbox[5..]) {
            assert_eq!(strip(first), strip(second));
        }
    }
}
