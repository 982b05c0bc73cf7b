// Messaging between the scheduler and the real-time audio callback

pub mod channels;
pub mod command;
