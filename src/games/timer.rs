use std::time::{Duration, Instant};

/// Handle returned when a task is registered, used to cancel it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

struct Task<E>
{
    id: TaskId,
    due: Instant,
    period: Option<Duration>,
    event: E,
}

/// Single-threaded timer wheel polled from a game loop.
///
/// Every game owns one of these. Clearing it on reset or game over is what
/// keeps callbacks from an old round from touching the next one.
pub struct Scheduler<E>
{
    tasks: Vec<Task<E>>,
    next_id: u64,
}

impl<E: Clone> Scheduler<E>
{
    pub fn new() -> Self
    {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn after(&mut self, delay: Duration, now: Instant, event: E) -> TaskId
    {
        self.push(now + delay, None, event)
    }

    pub fn every(&mut self, period: Duration, now: Instant, event: E) -> TaskId
    {
        // A zero period would make poll spin forever.
        let period = period.max(Duration::from_millis(1));
        self.push(now + period, Some(period), event)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool
    {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        before != self.tasks.len()
    }

    pub fn clear(&mut self)
    {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool
    {
        self.tasks.is_empty()
    }

    /// Returns every event due at or before `now`, oldest first.
    pub fn poll(&mut self, now: Instant) -> Vec<E>
    {
        let mut fired: Vec<(Instant, TaskId, E)> = Vec::new();

        for task in &mut self.tasks {
            match task.period {
                Some(period) => {
                    while task.due <= now {
                        fired.push((task.due, task.id, task.event.clone()));
                        task.due += period;
                    }
                }
                None => {
                    if task.due <= now {
                        fired.push((task.due, task.id, task.event.clone()));
                    }
                }
            }
        }
        self.tasks
            .retain(|task| task.period.is_some() || task.due > now);

        fired.sort_by_key(|(due, id, _)| (*due, *id));
        fired.into_iter().map(|(_, _, event)| event).collect()
    }

    fn push(&mut self, due: Instant, period: Option<Duration>, event: E) -> TaskId
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            due,
            period,
            event,
        });
        id
    }
}

impl<E: Clone> Default for Scheduler<E>
{
    fn default() -> Self
    {
        Self::new()
    }
}
