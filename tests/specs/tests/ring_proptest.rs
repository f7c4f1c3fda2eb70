// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the ring buffer's size/oldest invariant:
//! `size() = min(appends, capacity)` and `oldest = max(0, appends - capacity)`
//! for any capacity and append count.

use proptest::prelude::*;

proptest! {
    #[test]
    fn ring_size_and_oldest_track_capacity_and_total(capacity in 1usize..50, appends in 0usize..200) {
        let rt = tokio::runtime::Runtime::new().expect("build runtime");
        rt.block_on(async {
            let ring: outrig_server::RingBuffer<usize> = outrig_server::RingBuffer::new(capacity);
            for v in 0..appends {
                ring.append(v).await;
            }

            let expected_size = appends.min(capacity);
            prop_assert_eq!(ring.size().await, expected_size);

            let (total, oldest) = ring.total_and_oldest().await;
            prop_assert_eq!(total, appends as u64);
            let expected_oldest = appends.saturating_sub(capacity) as u64;
            prop_assert_eq!(oldest, expected_oldest);
            Ok(())
        })?;
    }
}
