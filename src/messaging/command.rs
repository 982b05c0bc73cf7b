// Commands - scheduler -> audio thread

use crate::synth::voice::ClickSpec;

#[derive(Debug, Clone, Copy)]
pub enum RenderCommand {
    /// Play a click at its start time
    Play(ClickSpec),
    /// Drop every pending and sounding click
    Clear,
}
