// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Address-block arithmetic, subnet carving, and fleet sizing are the
//! places where an off-by-one silently corrupts a topology; each gets
//! a property suite here.

mod address_blocks;
mod fleet_sizing;
mod subnet_carving;
