//! Unit tests for epi-schedule.

#[cfg(test)]
mod event_queue {
    use epi_core::{AgentId, Tick};

    use crate::{EventQueue, ScheduleError};

    #[test]
    fn ties_pop_in_insertion_order() {
        let mut q = EventQueue::new();
        q.push(Tick(5), 'a');
        q.push(Tick(2), 'b');
        q.push(Tick(5), 'c');

        assert_eq!(q.size(), 3);
        assert_eq!(q.pop_min().unwrap(), (Tick(2), 'b'));
        assert_eq!(q.pop_min().unwrap(), (Tick(5), 'a'));
        assert_eq!(q.pop_min().unwrap(), (Tick(5), 'c'));
        assert!(q.is_empty());
    }

    #[test]
    fn pop_on_empty_queue_fails() {
        let mut q: EventQueue<AgentId> = EventQueue::new();
        assert!(matches!(q.pop_min(), Err(ScheduleError::EmptyQueue)));
        assert!(q.peek_min().is_none());
        assert!(q.next_tick().is_none());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut q = EventQueue::with_capacity(4);
        q.push(Tick(9), AgentId(3));
        q.push(Tick(4), AgentId(1));
        assert_eq!(q.peek_min(), Some((Tick(4), &AgentId(1))));
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_tick(), Some(Tick(4)));
    }

    #[test]
    fn large_fifo_runs_stay_ordered() {
        let mut q = EventQueue::new();
        for i in 0..10_000u32 {
            q.push(Tick(u64::from(i % 7)), i);
        }
        let mut last = (Tick(0), 0u32);
        let mut first = true;
        while let Ok((tick, i)) = q.pop_min() {
            if !first {
                assert!(tick > last.0 || (tick == last.0 && i > last.1));
            }
            first = false;
            last = (tick, i);
        }
    }

    #[test]
    fn pop_due_stops_at_future_ticks() {
        let mut q = EventQueue::new();
        q.extend([(Tick(3), "recover"), (Tick(1), "infect"), (Tick(2), "onset"), (Tick(1), "infect2")]);

        let due: Vec<_> = std::iter::from_fn(|| q.pop_due(Tick(1))).map(|(_, p)| p).collect();
        assert_eq!(due, ["infect", "infect2"]);
        assert_eq!(q.len(), 2);
        assert!(q.pop_due(Tick(1)).is_none());
        assert_eq!(q.pop_due(Tick(10)), Some((Tick(2), "onset")));
    }

    #[test]
    fn clear_keeps_fifo_for_later_pushes() {
        let mut q = EventQueue::new();
        q.push(Tick(1), 0);
        q.clear();
        assert!(q.is_empty());
        q.push(Tick(1), 1);
        q.push(Tick(1), 2);
        assert_eq!(q.pop_min().unwrap().1, 1);
        assert_eq!(q.pop_min().unwrap().1, 2);
    }

    #[test]
    fn payload_needs_no_ordering() {
        struct Transition {
            agent: AgentId,
        }
        let mut q = EventQueue::new();
        q.push(Tick(2), Transition { agent: AgentId(7) });
        q.push(Tick(2), Transition { agent: AgentId(3) });
        assert_eq!(q.pop_min().unwrap().1.agent, AgentId(7));
    }
}
