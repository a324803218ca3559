// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Two-class work queue with bounded fairness between foreground and background work.
//!
//! Queued executions belong to one of two priority classes. Foreground work
//! (an interactive request with a client connection waiting on it) is served
//! ahead of background work (batch requests the client polls for), but a
//! steady stream of foreground submissions must not starve background jobs.
//!
//! # Scheduling Policy
//!
//! Weighted round-robin with a foreground weight `w`:
//!
//! 1. If only one class has pending work, it is served.
//! 2. If both classes have pending work, foreground is served up to `w` times
//!    in a row; the next dispatch then goes to background and the streak
//!    resets.
//! 3. Within a class, items are served in submission order (FIFO).
//!
//! Under sustained foreground load a waiting background item is therefore
//! dispatched after at most `w` foreground dispatches.
//!
//! # Capacity
//!
//! The queue holds at most `capacity` pending items across both classes.
//! Pushing beyond that is rejected and hands the item back to the caller.
//!
//! # Examples
//!
//! ```rust
//! use geoproc_executor::engine::priority_work_queue::FairWorkQueue;
//! use geoproc_executor::engine::Priority;
//!
//! let mut queue = FairWorkQueue::new(16, 2);
//! queue.push(Priority::Background, "batch").unwrap();
//! for job in ["fg1", "fg2", "fg3"] {
//!     queue.push(Priority::Foreground, job).unwrap();
//! }
//!
//! // Two foreground dispatches, then the waiting background job gets its turn
//! assert_eq!(queue.pop(), Some((Priority::Foreground, "fg1")));
//! assert_eq!(queue.pop(), Some((Priority::Foreground, "fg2")));
//! assert_eq!(queue.pop(), Some((Priority::Background, "batch")));
//! assert_eq!(queue.pop(), Some((Priority::Foreground, "fg3")));
//! assert_eq!(queue.pop(), None);
//! ```

use std::collections::VecDeque;

use crate::engine::execution::Priority;

/// Item handed back when the queue is full.
#[derive(Debug)]
pub struct QueueFull<T> {
    pub item: T,
    pub queued: usize,
}

#[derive(Debug)]
pub struct FairWorkQueue<T> {
    foreground: VecDeque<T>,
    background: VecDeque<T>,
    capacity: usize,
    foreground_weight: u32,
    foreground_streak: u32,
}

impl<T> FairWorkQueue<T> {
    /// `foreground_weight` below 1 is treated as 1.
    pub fn new(capacity: usize, foreground_weight: u32) -> Self {
        Self {
            foreground: VecDeque::new(),
            background: VecDeque::new(),
            capacity,
            foreground_weight: foreground_weight.max(1),
            foreground_streak: 0,
        }
    }

    pub fn push(&mut self, priority: Priority, item: T) -> Result<(), QueueFull<T>> {
        let queued = self.len();
        if queued >= self.capacity {
            return Err(QueueFull { item, queued });
        }
        match priority {
            Priority::Foreground => self.foreground.push_back(item),
            Priority::Background => self.background.push_back(item),
        }
        Ok(())
    }

    /// Next item according to the weighted round-robin policy.
    pub fn pop(&mut self) -> Option<(Priority, T)> {
        let serve_background = match (self.foreground.is_empty(), self.background.is_empty()) {
            (true, true) => return None,
            (false, true) => false,
            (true, false) => true,
            (false, false) => self.foreground_streak >= self.foreground_weight,
        };

        if serve_background {
            self.foreground_streak = 0;
            self.background
                .pop_front()
                .map(|item| (Priority::Background, item))
        } else {
            // streak only matters while background work is waiting
            if self.background.is_empty() {
                self.foreground_streak = 0;
            } else {
                self.foreground_streak += 1;
            }
            self.foreground
                .pop_front()
                .map(|item| (Priority::Foreground, item))
        }
    }

    /// Remove the first item matching `predicate`, from either class.
    pub fn remove_first<F>(&mut self, mut predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        for queue in [&mut self.foreground, &mut self.background] {
            if let Some(index) = queue.iter().position(&mut predicate) {
                return queue.remove(index);
            }
        }
        None
    }

    /// Empty both classes, foreground first.
    pub fn drain(&mut self) -> Vec<T> {
        self.foreground_streak = 0;
        self.foreground
            .drain(..)
            .chain(self.background.drain(..))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.foreground.len() + self.background.len()
    }

    pub fn len_of(&self, priority: Priority) -> usize {
        match priority {
            Priority::Foreground => self.foreground.len(),
            Priority::Background => self.background.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty() && self.background.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
