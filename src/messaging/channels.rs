// Lock-free render queue (SPSC)

use crate::messaging::command::RenderCommand;
use ringbuf::{HeapRb, traits::Split};

pub type RenderProducer = ringbuf::HeapProd<RenderCommand>;
pub type RenderConsumer = ringbuf::HeapCons<RenderCommand>;

pub fn create_render_channel(capacity: usize) -> (RenderProducer, RenderConsumer) {
    let rb = HeapRb::<RenderCommand>::new(capacity.max(1));
    rb.split()
}
