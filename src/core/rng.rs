//! Random source shared by the stochastic operators.
//!
//! Operators never own a generator; they draw from the one handed to
//! [`Transform::apply`](crate::core::Transform::apply). [`Compose::apply`](crate::core::Compose::apply)
//! uses the thread-local generator below, so seeding it with
//! [`seed_thread_rng`] makes a whole pipeline run reproducible on that thread.
//! Callers that want full control pass their own generator to
//! [`Compose::apply_with_rng`](crate::core::Compose::apply_with_rng).

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::cell::RefCell;

thread_local! {
    /// Thread-local pipeline RNG, seeded from the OS until reseeded.
    /// `None` while lent out to a running pipeline.
    static PIPELINE_RNG: RefCell<Option<StdRng>> = RefCell::new(Some(StdRng::from_os_rng()));
}

/// Reseed the calling thread's pipeline RNG.
pub fn seed_thread_rng(seed: u64) {
    PIPELINE_RNG.with(|rng| {
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Puts a lent generator back into the thread slot, also on unwind.
struct Lent(Option<StdRng>);

impl Drop for Lent {
    fn drop(&mut self) {
        if let Some(rng) = self.0.take() {
            let _ = PIPELINE_RNG.try_with(|slot| *slot.borrow_mut() = Some(rng));
        }
    }
}

/// Run `f` with exclusive access to the calling thread's pipeline RNG.
///
/// The generator is moved out of the thread slot for the duration of `f`,
/// so no borrow is held while `f` blocks on rayon work. A call that arrives
/// on the same thread in the meantime (a stolen rayon task) gets a fresh
/// OS-seeded generator and leaves the lent stream untouched.
pub fn with_thread_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    let mut lent = Lent(PIPELINE_RNG.with(|slot| slot.borrow_mut().take()));
    match lent.0.as_mut() {
        Some(rng) => f(rng),
        None => {
            log::debug!("Thread RNG already in use, drawing from a fresh generator");
            f(&mut StdRng::from_os_rng())
        }
    }
}

/// One probability gate draw: true when the operator should fire.
pub(crate) fn gate(rng: &mut dyn RngCore, prob: f64) -> bool {
    rng.random::<f64>() < prob
}

/// `low + (high - low) * u` with `u` in [0, 1); tolerates `low >= high`.
pub(crate) fn uniform(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.random::<f64>()
}
