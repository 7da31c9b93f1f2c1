// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Address Block Arithmetic
//!
//! Sub-block carving is pure integer arithmetic on the address space;
//! these properties pin down containment, disjointness, and the
//! canonical string form for all valid prefixes.

use cim_topology::domain::CidrBlock;
use proptest::prelude::*;
use std::net::Ipv4Addr;

// ============================================================================
// Strategies
// ============================================================================

/// An aligned block with prefix 8-24 anywhere in the address space
fn aligned_block() -> impl Strategy<Value = CidrBlock> {
    (8u8..=24, any::<u32>()).prop_map(|(prefix, raw)| {
        let masked = raw & (u32::MAX << (32 - prefix));
        CidrBlock::from_parts(Ipv4Addr::from(masked), prefix).unwrap()
    })
}

/// A block plus a sub-prefix it can be carved at
fn block_and_sub_prefix() -> impl Strategy<Value = (CidrBlock, u8)> {
    (aligned_block(), 1u8..=6).prop_map(|(block, extra)| {
        let sub = block.prefix_len() + extra;
        (block, sub)
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: every carved sub-block stays inside its parent
    #[test]
    fn prop_subblocks_contained((block, sub) in block_and_sub_prefix()) {
        for index in 0..block.subblock_count(sub) {
            let carved = block.nth_subblock(sub, index).unwrap();
            prop_assert!(block.contains(&carved), "{} escapes {}", carved, block);
            prop_assert_eq!(carved.prefix_len(), sub);
        }
    }

    /// Property: distinct indices carve disjoint sub-blocks
    #[test]
    fn prop_subblocks_disjoint((block, sub) in block_and_sub_prefix()) {
        let count = block.subblock_count(sub).min(8);
        for i in 0..count {
            for j in (i + 1)..count {
                let a = block.nth_subblock(sub, i).unwrap();
                let b = block.nth_subblock(sub, j).unwrap();
                prop_assert!(!a.overlaps(&b), "{} overlaps {}", a, b);
            }
        }
    }

    /// Property: index 0 shares the parent's network address
    #[test]
    fn prop_first_subblock_is_anchored((block, sub) in block_and_sub_prefix()) {
        let first = block.nth_subblock(sub, 0).unwrap();
        prop_assert_eq!(first.network(), block.network());
    }

    /// Property: an index past the last slot is rejected, never wrapped
    #[test]
    fn prop_out_of_range_index_rejected((block, sub) in block_and_sub_prefix()) {
        let count = block.subblock_count(sub);
        prop_assert!(block.nth_subblock(sub, count).is_err());
    }

    /// Property: the canonical string form parses back to the same block
    #[test]
    fn prop_display_parse_inverse(block in aligned_block()) {
        let reparsed = CidrBlock::new(block.to_string()).unwrap();
        prop_assert_eq!(reparsed, block);
    }

    /// Property: containment implies overlap in both directions
    #[test]
    fn prop_contains_implies_overlaps((block, sub) in block_and_sub_prefix()) {
        let carved = block.nth_subblock(sub, 0).unwrap();
        prop_assert!(block.overlaps(&carved));
        prop_assert!(carved.overlaps(&block));
    }
}
