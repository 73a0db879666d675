//! Worklist propagation to a fixpoint.

use tracing::trace;

use super::graph::TypeGraph;

impl TypeGraph<'_> {
    /// Drain the queue, pushing each resolved type through its consumers.
    ///
    /// Returns the number of propagations performed. Terminates because a
    /// consumer whose candidate repeats the last one it produced (including
    /// the `ctx_access` mark, which type equality ignores) is not requeued.
    pub(super) fn propagate(&mut self) -> usize {
        let mut steps = 0;
        while let Some((source, ty)) = self.queue.pop_front() {
            // Transforms never touch the edge table, so the consumers can be
            // taken out while they run.
            let Some(mut consumers) = self.edges.remove(&source) else {
                continue;
            };

            for consumer in &mut consumers {
                let candidate = consumer.kind.apply(&mut self.cx, &ty);
                if candidate.is_none() {
                    continue;
                }
                let repeated = consumer
                    .last_propagated
                    .as_ref()
                    .is_some_and(|last| *last == candidate && last.ctx_access == candidate.ctx_access);
                if repeated {
                    continue;
                }

                trace!(?source, target = ?consumer.target, ty = %candidate, "propagate");
                steps += 1;
                consumer.last_propagated = Some(candidate.clone());
                self.cx.resolved.insert(consumer.target, candidate.clone());
                self.queue.push_back((consumer.target, candidate));
            }

            self.edges.insert(source, consumers);
        }
        steps
    }
}
