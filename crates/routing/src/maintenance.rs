//! Periodic self-repair: stabilize, fix-fingers, check-predecessor.
//!
//! Three independent tasks run at a fixed cadence with staggered starts so
//! they do not contend in lockstep. None of them can fail the process:
//! every remote error resolves into a local state correction (failover,
//! scrub, cleared predecessor) and the next tick tries again.

use corelib::view::SUCCESSOR_LIST_LEN;
use corelib::NodeAddress;
use protocol::{Request, Response};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::node::ChordNode;

/// Cadence shared by the three maintenance actions.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(500);
/// Offset between the staggered task starts.
pub const STAGGER_OFFSET: Duration = Duration::from_millis(200);

impl ChordNode {
    /// One stabilization pass.
    ///
    /// Verifies the successor pointer against the successor's own view,
    /// failing over down the successor list when the successor is dead, and
    /// finishes by notifying the (possibly updated) successor of this node's
    /// presence.
    pub async fn stabilize(&self) {
        let space = self.view().space();
        let self_id = self.self_addr().id;

        if self.view().successor() == *self.self_addr() {
            // Ring of one or total isolation. If anyone has notified us, that
            // peer is the only other node we know: close the ring through it.
            if let Some(predecessor) = self.view().predecessor() {
                self.view().set_successor(predecessor);
            }
            return;
        }

        let Some((perceived, successors)) = self.query_successor_for_stabilization().await
        else {
            warn!(node = %self.self_addr(), "stabilization failed, could not recover");
            return;
        };

        self.view().merge_successors(&successors);

        let Some(perceived) = perceived else {
            // Successor does not know a predecessor yet; introduce ourselves.
            self.notify_successor().await;
            return;
        };

        if perceived.id == self_id {
            return;
        }

        // The successor's predecessor sits between us and the successor: the
        // ring has tightened and that peer is our real successor now.
        if space.between(self_id, self.view().successor().id, perceived.id, false, false) {
            self.view().set_successor(perceived);
        }

        self.notify_successor().await;
    }

    /// Combined predecessor + successor-list query with failover.
    ///
    /// Walks the successor list promoting the next entry on each failure;
    /// when even the last entry is unreachable the node is isolated and the
    /// successor collapses to self.
    async fn query_successor_for_stabilization(
        &self,
    ) -> Option<(Option<NodeAddress>, Vec<NodeAddress>)> {
        for attempt in 0..SUCCESSOR_LIST_LEN {
            let successor = self.view().successor();
            let batch = Request::Batch(vec![
                Request::GetPredecessor,
                Request::ReconcileSuccessorList,
            ]);

            match self.transport().call(&successor, batch).await {
                Ok(Response::Batch { status, responses }) if status.is_ok() => {
                    if let [Response::Predecessor {
                        status: pred_status,
                        addr,
                    }, Response::Successors {
                        status: list_status,
                        list,
                    }] = responses.as_slice()
                    {
                        if pred_status.is_ok() && list_status.is_ok() {
                            return Some((addr.clone(), list.clone()));
                        }
                    }
                }
                _ => {}
            }

            let successors = self.view().successors();
            if attempt + 1 < SUCCESSOR_LIST_LEN {
                debug!(node = %self.self_addr(), failed = %successor,
                    "stabilization failed, trying next successor from list");
                self.view().set_successor(successors[attempt + 1].clone());
            } else {
                self.view().set_successor(self.self_addr().clone());
            }
        }
        None
    }

    async fn notify_successor(&self) {
        let successor = self.view().successor();
        let request = Request::Notify(self.self_addr().clone());
        match self.transport().call(&successor, request).await {
            Ok(response) if response.status().is_ok() => {}
            _ => {
                debug!(node = %self.self_addr(), successor = %successor,
                    "stabilization failed (notify on successor)");
            }
        }
    }

    /// Refresh one finger-table slot, selected round-robin. The slot pointer
    /// advances whether or not the resolved address changed anything.
    pub async fn fix_fingers(&self) {
        let slot = self.view().fix_index();
        let target = self.view().step_target(slot);
        let resolved = self.find_successor(target).await;
        self.view().maybe_set_finger(slot, resolved);
        self.view().advance_fix_index();
    }

    /// Probe the predecessor; forget it when it does not answer. A cleared
    /// predecessor is a normal, frequent outcome after churn and lets the
    /// next notify re-seat it.
    pub async fn check_predecessor(&self) {
        let Some(predecessor) = self.view().predecessor() else {
            return;
        };
        let alive = matches!(
            self.transport().call(&predecessor, Request::Ping).await,
            Ok(response) if response.status().is_ok()
        );
        if !alive {
            debug!(node = %self.self_addr(), predecessor = %predecessor, "predecessor failed");
            self.view().clear_predecessor();
        }
    }
}

/// Handle to the three running maintenance tasks. Dropping it stops them.
pub struct Maintenance {
    tasks: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Spawn stabilize, fix-fingers, and check-predecessor on staggered
    /// schedules (0ms, 200ms, 400ms initial delay; 500ms cadence each).
    pub fn spawn(node: ChordNode) -> Self {
        let stabilizer = node.clone();
        let fixer = node.clone();
        let prober = node;

        let tasks = vec![
            tokio::spawn(run_periodic(Duration::ZERO, move || {
                let node = stabilizer.clone();
                async move { node.stabilize().await }
            })),
            tokio::spawn(run_periodic(STAGGER_OFFSET, move || {
                let node = fixer.clone();
                async move { node.fix_fingers().await }
            })),
            tokio::spawn(run_periodic(STAGGER_OFFSET * 2, move || {
                let node = prober.clone();
                async move { node.check_predecessor().await }
            })),
        ];
        Self { tasks }
    }

    /// Stop the maintenance tasks. In-flight remote calls are abandoned;
    /// peers observe the failure through their normal retry paths.
    pub fn shutdown(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn run_periodic<F, Fut>(initial_delay: Duration, mut action: F)
where
    F: FnMut() -> Fut + Send,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::time::sleep(initial_delay).await;
    let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        action().await;
    }
}
