//! Fork/join worker pool and the shared state it owns.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use scoped_threadpool;

use ::bins::{FragmentBin, FragQueue, MAX_BINNED_PRIMS};
use ::blit::BlitProcessor;
use ::framebuffer::FramebufferView;
use ::mesh::Mesh;
use ::shader::Shader;
use ::texture::TextureView;
use ::vertex::VertexProcessor;

/// Interior-mutable storage shared across the draw workers.
///
/// The draw-phase protocol, not the borrow checker, keeps accesses disjoint:
/// bin slots are claimed through an atomic counter and queue slots are
/// per-thread. Outside a draw only the pool touches the contents.
pub struct Trusted<T> {
    inner: UnsafeCell<T>,
}

impl<T> Trusted<T> {
    pub fn new(value: T) -> Trusted<T> {
        Trusted { inner: UnsafeCell::new(value) }
    }

    #[inline(always)]
    pub fn as_ref(&self) -> &T {
        unsafe { &*self.inner.get() }
    }

    #[inline(always)]
    pub fn as_mut(&self) -> &mut T {
        unsafe { &mut *self.inner.get() }
    }
}

unsafe impl<T: Send> Send for Trusted<T> {}
unsafe impl<T: Send> Sync for Trusted<T> {}

/// Reusable spinning rendezvous for the fixed set of draw workers.
pub struct SpinBarrier {
    total: usize,
    count: AtomicUsize,
    generation: AtomicUsize,
}

impl SpinBarrier {
    pub fn new(total: usize) -> SpinBarrier {
        SpinBarrier {
            total: total,
            count: AtomicUsize::new(0),
            generation: AtomicUsize::new(0),
        }
    }

    /// Block (spinning) until all workers arrive. Writes made before the
    /// wait are visible to every worker after it.
    pub fn wait(&self) {
        let generation = self.generation.load(Ordering::Acquire);

        if self.count.fetch_add(1, Ordering::AcqRel) + 1 == self.total {
            self.count.store(0, Ordering::Release);
            self.generation.fetch_add(1, Ordering::Release);
        } else {
            while self.generation.load(Ordering::Acquire) == generation {
                ::std::hint::spin_loop();
            }
        }
    }
}

/// Counters coordinating bin production between the vertex workers and the
/// mid-draw flushes that drain them.
pub struct BinCounters {
    bins_used: AtomicUsize,
    flush_requested: AtomicBool,
    producers_done: AtomicUsize,
    barrier: SpinBarrier,
    num_threads: usize,
}

impl BinCounters {
    pub fn new(num_threads: usize) -> BinCounters {
        BinCounters {
            bins_used: AtomicUsize::new(0),
            flush_requested: AtomicBool::new(false),
            producers_done: AtomicUsize::new(0),
            barrier: SpinBarrier::new(num_threads),
            num_threads: num_threads,
        }
    }

    /// Reset for a fresh draw. Must not be called while workers are live.
    pub fn reset(&self) {
        self.bins_used.store(0, Ordering::Release);
        self.flush_requested.store(false, Ordering::Release);
        self.producers_done.store(0, Ordering::Release);
    }

    /// Claim the next bin slot. Relaxed is enough: publication happens at
    /// the flush rendezvous, not here.
    #[inline]
    pub fn claim_slot(&self) -> usize {
        self.bins_used.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of valid bins to drain.
    #[inline]
    pub fn used(&self) -> usize {
        self.bins_used.load(Ordering::Acquire).min(MAX_BINNED_PRIMS)
    }

    #[inline]
    pub fn request_flush(&self) {
        self.flush_requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn flush_requested(&self) -> bool {
        self.flush_requested.load(Ordering::Acquire)
    }

    /// Thread 0 calls this between flush rendezvous points.
    pub fn finish_flush(&self) {
        self.bins_used.store(0, Ordering::Release);
        self.flush_requested.store(false, Ordering::Release);
    }

    #[inline]
    pub fn finish_producer(&self) {
        self.producers_done.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn all_producers_done(&self) -> bool {
        self.producers_done.load(Ordering::Acquire) == self.num_threads
    }

    #[inline]
    pub fn rendezvous(&self) {
        self.barrier.wait();
    }
}

/// Owns the worker threads and every slab the pipeline phases share: the
/// primitive bin array and the per-worker fragment queues. Nothing else is
/// allowed to mutate them.
pub struct ProcessorPool {
    pool: scoped_threadpool::Pool,
    num_threads: usize,
    bins: Trusted<Vec<FragmentBin>>,
    queues: Trusted<Vec<FragQueue>>,
    counters: BinCounters,
}

impl ProcessorPool {
    pub fn new(num_threads: usize) -> ProcessorPool {
        let num_threads = num_threads.max(1);

        debug!("Spawning processor pool with {} threads", num_threads);

        ProcessorPool {
            pool: scoped_threadpool::Pool::new(num_threads as u32),
            num_threads: num_threads,
            bins: Trusted::new(vec![FragmentBin::empty(); MAX_BINNED_PRIMS]),
            queues: Trusted::new(vec![FragQueue::empty(); num_threads]),
            counters: BinCounters::new(num_threads),
        }
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Resize the pool, reallocating the per-thread queues and the flush
    /// rendezvous to match.
    pub fn set_num_threads(&mut self, num_threads: usize) {
        let num_threads = num_threads.max(1);

        if num_threads == self.num_threads {
            return;
        }

        debug!("Resizing processor pool from {} to {} threads", self.num_threads, num_threads);

        self.pool = scoped_threadpool::Pool::new(num_threads as u32);
        self.num_threads = num_threads;
        self.queues = Trusted::new(vec![FragQueue::empty(); num_threads]);
        self.counters = BinCounters::new(num_threads);
    }

    /// Drop any binned primitives from an abandoned draw.
    pub fn clear_fragment_bins(&mut self) {
        self.counters.reset();
    }

    /// Run the draw pipeline: every worker transforms its share of the
    /// primitives into bins, then the workers drain the bins through the
    /// rasterizer over their own scanlines. Returns once the framebuffer
    /// writes are complete.
    pub fn run_shader_processors(
        &mut self,
        mesh: &Mesh,
        num_instances: usize,
        shader: &Shader,
        fbo: &FramebufferView,
        depth_range: (f32, f32),
    ) {
        self.counters.reset();

        let num_threads = self.num_threads;
        let bins = &self.bins;
        let queues = &self.queues;
        let counters = &self.counters;

        trace!("Dispatching {} primitives over {} threads", mesh.num_primitives(), num_threads);

        self.pool.scoped(|scope| {
            for thread_id in 0..num_threads {
                let processor = VertexProcessor {
                    thread_id: thread_id,
                    num_threads: num_threads,
                    mesh: mesh,
                    num_instances: num_instances,
                    shader: shader,
                    fbo: fbo,
                    counters: counters,
                    bins: bins,
                    queues: queues,
                    depth_range: depth_range,
                };

                scope.execute(move || processor.execute());
            }
        });
    }

    /// Fork/join the blit processors: worker `t` copies the destination rows
    /// where `row mod num_threads == t`.
    pub fn run_blit_processors(
        &mut self,
        src: &TextureView,
        dst: &TextureView,
        src_rect: (u16, u16, u16, u16),
        dst_rect: (u16, u16, u16, u16),
    ) {
        let num_threads = self.num_threads;

        self.pool.scoped(|scope| {
            for thread_id in 0..num_threads {
                let processor = BlitProcessor {
                    thread_id: thread_id,
                    num_threads: num_threads,
                    src: src,
                    dst: dst,
                    src_rect: src_rect,
                    dst_rect: dst_rect,
                };

                scope.execute(move || processor.execute());
            }
        });
    }

    /// Begin a round of worker execution. The scoped dispatches above are
    /// synchronous, so this only exists to mirror the primitive fork/join
    /// control surface; `execute` is `flush` followed by `wait`.
    pub fn flush(&mut self) {}

    /// Wait for the workers to reach the join barrier. Synchronous
    /// dispatches have already joined by the time this returns.
    pub fn wait(&mut self) {
        self.pool.scoped(|_| {});
    }

    pub fn execute(&mut self) {
        self.flush();
        self.wait();
    }
}

impl Default for ProcessorPool {
    fn default() -> ProcessorPool {
        ProcessorPool::new(::num_cpus::get())
    }
}
