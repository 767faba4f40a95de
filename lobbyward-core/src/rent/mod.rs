//! Rent slot pools: three time-boxed rental units per channel.
//!
//! Each slot moves through request → approval/denial → occupied → expiry.
//! Expiry is lazy: a slot whose end instant has passed reads as available
//! even before the refresh task clears it.

mod pool;
mod registry;

pub use pool::{
    PoolView, RentError, RentPool, RentSlot, SlotRequest, SlotStatus, SlotView, SLOT_COUNT,
};
pub use registry::RentRegistry;
