//! Event handling.
//!
//! This library exposes an event-based interface for reacting
//! to the state changes of the machine in real-time, for example to redraw the mailboxes of a
//! display. [EventListeners](EventListener) can be registered on the
//! [Machine](crate::machine::Machine) with the
//! [add_listener](crate::machine::Machine::add_listener) method.
//!
//! A blanket implementation of [EventListener] for all `FnMut(&Event)` is provided.

use crate::instruction::{Address, Word};

/// Represents an event that occurred while executing a program.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The program modified a memory location.
    MemoryChange {
        /// The address of the changed memory location.
        address: Address,

        /// New value of the changed memory location.
        data: Word,
    },

    /// The program modified the accumulator.
    AccumulatorChange {
        /// The new value of the accumulator.
        data: Word,
    },

    /// A branch instruction was taken.
    Jump {
        from: Address,
        to: Address,
    },

    /// The program read a value from the input.
    Input {
        data: Word,
    },

    /// The program appended text to the output.
    Output {
        text: String,
    },

    /// The machine stopped, either because of `HLT` or an error.
    Halt,
}

/// Trait for consuming events.
pub trait EventListener {
    /// Called whenever a new event has been created.
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F where F: FnMut(&Event) {
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener) as Box<dyn EventListener>)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn dispatch(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener.event(&event);
        }
    }
}
