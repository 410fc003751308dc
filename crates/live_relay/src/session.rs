//! The relay loop: step, query, send, pace, repeat until the run drains.

use std::time::Duration;

use sumo_control::traci::TraciClient;
use sumo_control::ControlError;

use crate::events::{ServerEvent, VehicleSnapshot};

/// Seam over the engine control connection so the loop is testable without
/// a running engine.
pub trait SimulationEngine {
    fn advance_step(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(), ControlError>> + Send;
    fn expected_vehicle_count(
        &mut self,
    ) -> impl std::future::Future<Output = Result<i32, ControlError>> + Send;
    fn active_vehicle_ids(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ControlError>> + Send;
    fn vehicle_snapshot(
        &mut self,
        vehicle_id: &str,
    ) -> impl std::future::Future<Output = Result<VehicleSnapshot, ControlError>> + Send;
    fn close(&mut self) -> impl std::future::Future<Output = Result<(), ControlError>> + Send;
}

impl SimulationEngine for TraciClient {
    async fn advance_step(&mut self) -> Result<(), ControlError> {
        self.simulation_step().await
    }

    async fn expected_vehicle_count(&mut self) -> Result<i32, ControlError> {
        self.min_expected_vehicles().await
    }

    async fn active_vehicle_ids(&mut self) -> Result<Vec<String>, ControlError> {
        self.vehicle_ids().await
    }

    async fn vehicle_snapshot(&mut self, vehicle_id: &str) -> Result<VehicleSnapshot, ControlError> {
        let (x, y) = self.vehicle_position(vehicle_id).await?;
        let angle = self.vehicle_angle(vehicle_id).await?;
        let vehicle_type = self.vehicle_type(vehicle_id).await?;
        Ok(VehicleSnapshot {
            id: vehicle_id.to_string(),
            x,
            y,
            angle,
            vehicle_type,
        })
    }

    async fn close(&mut self) -> Result<(), ControlError> {
        TraciClient::close(self).await
    }
}

/// Seam over the client channel; a failed send means the client is gone.
pub trait EventSink {
    fn send_event(
        &mut self,
        event: &ServerEvent,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// What one finished session looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub steps: u64,
    /// The client channel died before the run drained.
    pub client_lost: bool,
}

/// Drive one engine run to completion.
///
/// Each iteration checks the engine's expected-vehicle count, advances one
/// step, snapshots every active vehicle, and sends one update frame. A
/// vehicle that leaves the network between the id listing and its query is
/// skipped; the frame simply omits it. When the count reaches zero (or the
/// client channel dies) one final end event is attempted and the loop exits.
/// Engine-side failures propagate to the caller, which owns cleanup.
pub async fn run_session<E, S>(
    engine: &mut E,
    sink: &mut S,
    pacing: Duration,
) -> Result<SessionSummary, ControlError>
where
    E: SimulationEngine,
    S: EventSink,
{
    let mut summary = SessionSummary {
        steps: 0,
        client_lost: false,
    };

    while engine.expected_vehicle_count().await? > 0 {
        engine.advance_step().await?;
        summary.steps += 1;

        let ids = engine.active_vehicle_ids().await?;
        let mut vehicles = Vec::with_capacity(ids.len());
        for id in &ids {
            match engine.vehicle_snapshot(id).await {
                Ok(snapshot) => vehicles.push(snapshot),
                // Left the network mid-frame.
                Err(ControlError::Command { .. }) => {}
                Err(other) => return Err(other),
            }
        }

        if sink
            .send_event(&ServerEvent::SimulationUpdate { vehicles })
            .await
            .is_err()
        {
            summary.client_lost = true;
            break;
        }

        tokio::time::sleep(pacing).await;
    }

    // Best effort; the channel may already be gone.
    let _ = sink.send_event(&ServerEvent::SimulationEnd).await;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plays back a fixed per-step script of expected counts and vehicles.
    struct ScriptedEngine {
        /// One expected-count per loop check, consumed front to back.
        expected: Vec<i32>,
        /// Vehicle ids visible after each step.
        ids_per_step: Vec<Vec<&'static str>>,
        /// Ids whose snapshot query fails as departed.
        departed: Vec<&'static str>,
        steps: usize,
    }

    impl ScriptedEngine {
        fn new(expected: Vec<i32>, ids_per_step: Vec<Vec<&'static str>>) -> Self {
            Self {
                expected,
                ids_per_step,
                departed: Vec::new(),
                steps: 0,
            }
        }
    }

    impl SimulationEngine for ScriptedEngine {
        async fn advance_step(&mut self) -> Result<(), ControlError> {
            self.steps += 1;
            Ok(())
        }

        async fn expected_vehicle_count(&mut self) -> Result<i32, ControlError> {
            Ok(self.expected.remove(0))
        }

        async fn active_vehicle_ids(&mut self) -> Result<Vec<String>, ControlError> {
            Ok(self.ids_per_step[self.steps - 1]
                .iter()
                .map(|id| id.to_string())
                .collect())
        }

        async fn vehicle_snapshot(
            &mut self,
            vehicle_id: &str,
        ) -> Result<VehicleSnapshot, ControlError> {
            if self.departed.contains(&vehicle_id) {
                return Err(ControlError::Command {
                    command: 0xa4,
                    description: format!("vehicle '{vehicle_id}' is not known"),
                });
            }
            Ok(VehicleSnapshot {
                id: vehicle_id.to_string(),
                x: 1.0,
                y: 2.0,
                angle: 0.0,
                vehicle_type: "car".to_string(),
            })
        }

        async fn close(&mut self) -> Result<(), ControlError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<ServerEvent>,
        fail_after: Option<usize>,
    }

    impl EventSink for RecordingSink {
        async fn send_event(&mut self, event: &ServerEvent) -> Result<(), String> {
            if let Some(limit) = self.fail_after {
                if self.events.len() >= limit {
                    return Err("socket closed".to_string());
                }
            }
            self.events.push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn loop_runs_until_no_vehicles_are_expected() {
        let mut engine = ScriptedEngine::new(
            vec![2, 1, 0],
            vec![vec!["veh0", "veh1"], vec!["veh1"]],
        );
        let mut sink = RecordingSink::default();

        let summary = run_session(&mut engine, &mut sink, Duration::ZERO)
            .await
            .expect("session should complete");

        assert_eq!(summary.steps, 2);
        assert!(!summary.client_lost);
        assert_eq!(sink.events.len(), 3);
        match &sink.events[0] {
            ServerEvent::SimulationUpdate { vehicles } => assert_eq!(vehicles.len(), 2),
            other => panic!("expected update frame, got {other:?}"),
        }
        assert_eq!(sink.events[2], ServerEvent::SimulationEnd);
    }

    #[tokio::test]
    async fn departed_vehicle_is_omitted_from_the_frame() {
        let mut engine = ScriptedEngine::new(vec![2, 0], vec![vec!["veh0", "veh1"]]);
        engine.departed.push("veh0");
        let mut sink = RecordingSink::default();

        run_session(&mut engine, &mut sink, Duration::ZERO)
            .await
            .expect("session should complete");

        match &sink.events[0] {
            ServerEvent::SimulationUpdate { vehicles } => {
                assert_eq!(vehicles.len(), 1);
                assert_eq!(vehicles[0].id, "veh1");
            }
            other => panic!("expected update frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dead_client_ends_the_session_early() {
        let mut engine = ScriptedEngine::new(
            vec![3, 3, 3, 0],
            vec![vec!["veh0"], vec!["veh0"], vec!["veh0"]],
        );
        let mut sink = RecordingSink {
            fail_after: Some(1),
            ..Default::default()
        };

        let summary = run_session(&mut engine, &mut sink, Duration::ZERO)
            .await
            .expect("session should complete");

        assert!(summary.client_lost);
        assert_eq!(summary.steps, 2);
        // Only the first frame got through; the end event failed too.
        assert_eq!(sink.events.len(), 1);
    }

    #[tokio::test]
    async fn engine_failure_propagates() {
        struct BrokenEngine;

        impl SimulationEngine for BrokenEngine {
            async fn advance_step(&mut self) -> Result<(), ControlError> {
                Err(ControlError::Protocol("engine hung up".to_string()))
            }
            async fn expected_vehicle_count(&mut self) -> Result<i32, ControlError> {
                Ok(1)
            }
            async fn active_vehicle_ids(&mut self) -> Result<Vec<String>, ControlError> {
                Ok(Vec::new())
            }
            async fn vehicle_snapshot(
                &mut self,
                _vehicle_id: &str,
            ) -> Result<VehicleSnapshot, ControlError> {
                unreachable!("step fails first")
            }
            async fn close(&mut self) -> Result<(), ControlError> {
                Ok(())
            }
        }

        let mut sink = RecordingSink::default();
        let error = run_session(&mut BrokenEngine, &mut sink, Duration::ZERO)
            .await
            .expect_err("engine failure should surface");

        assert!(matches!(error, ControlError::Protocol(_)));
        assert!(sink.events.is_empty());
    }
}
