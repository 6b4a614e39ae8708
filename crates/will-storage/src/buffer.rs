//! Pure operations on the buffered increment sequence.
//!
//! The sequence is bounded: once it holds `max_entries` entries, new taps are
//! folded into the newest entry. Counts are never discarded, so the buffered
//! total always equals the number of taps recorded.

use will_core::models::PendingIncrement;

/// Append `increment`, coalescing into the newest entry when full.
///
/// Returns `true` if the increment was coalesced rather than appended.
pub fn append(
    buffer: &mut Vec<PendingIncrement>,
    increment: PendingIncrement,
    max_entries: usize,
) -> bool {
    if buffer.len() >= max_entries.max(1) {
        if let Some(newest) = buffer.last_mut() {
            if let Some(merged) = newest.count.checked_add(increment.count) {
                newest.count = merged;
                newest.timestamp = newest.timestamp.max(increment.timestamp);
                return true;
            }
        }
    }
    buffer.push(increment);
    false
}

/// Remove exactly `count` taps from the front of the sequence, splitting the
/// boundary entry if needed. Returns the number of taps actually removed,
/// which is less than `count` only when the buffer held fewer.
pub fn settle(buffer: &mut Vec<PendingIncrement>, count: u64) -> u64 {
    let mut remaining = count;
    let mut drained = 0;
    for entry in buffer.iter_mut() {
        if remaining == 0 {
            break;
        }
        let available = u64::from(entry.count);
        if available <= remaining {
            remaining -= available;
            drained += 1;
        } else {
            // `remaining < available <= u32::MAX`, so the cast is lossless.
            entry.count -= remaining as u32;
            remaining = 0;
        }
    }
    buffer.drain(..drained);
    count - remaining
}
