//! Arithmetic over address blocks: partitioning, containment and overlap.

use crate::error::{PlanError, PlanResult};
use crate::models::{block_size, AddressBlock, MAX_LENGTH};

/// Number of `/netmask` sub-blocks that fit in `block`.
///
/// Fails with `Capacity` if `netmask` does not make the block smaller.
pub fn sub_block_count(block: AddressBlock, netmask: u8) -> PlanResult<u64> {
    if netmask > MAX_LENGTH {
        return Err(PlanError::invalid_block(
            format!("/{netmask}"),
            "netmask is too long",
        ));
    }
    if netmask <= block.prefix() {
        return Err(capacity(
            block,
            format!("netmask /{netmask} must be longer than /{}", block.prefix()),
        ));
    }
    Ok(1u64 << (netmask - block.prefix()))
}

/// The `index`th `/netmask` sub-block of `block`, in ascending address order.
pub fn nth_block(block: AddressBlock, netmask: u8, index: u64) -> PlanResult<AddressBlock> {
    let count = sub_block_count(block, netmask)?;
    if index >= count {
        return Err(capacity(
            block,
            format!("sub-block #{index} of /{netmask} does not fit ({count} available)"),
        ));
    }
    let offset = index * block_size(netmask)?;
    AddressBlock::from_bits((block.lo() as u64 + offset) as u32, netmask)
}

/// Split `block` into aligned `/netmask` sub-blocks and return the first `count`.
pub fn partition(block: AddressBlock, netmask: u8, count: usize) -> PlanResult<Vec<AddressBlock>> {
    let available = sub_block_count(block, netmask)?;
    if available < count as u64 {
        return Err(capacity(
            block,
            format!("{count} x /{netmask} requested, only {available} fit"),
        ));
    }
    (0..count as u64)
        .map(|i| nth_block(block, netmask, i))
        .collect()
}

/// True if every address of `inner` is inside `outer`.
pub fn contains(outer: AddressBlock, inner: AddressBlock) -> bool {
    outer.prefix() <= inner.prefix() && outer.lo() <= inner.lo() && inner.hi() <= outer.hi()
}

/// True if the two blocks share any address.
pub fn overlaps(a: AddressBlock, b: AddressBlock) -> bool {
    a.lo() <= b.hi() && b.lo() <= a.hi()
}

fn capacity(block: AddressBlock, reason: String) -> PlanError {
    PlanError::Capacity {
        group: String::new(),
        block: block.to_string(),
        reason,
    }
}
