//! # binalloc - A Segregated Free-List Allocator
//!
//! This crate provides a **power-of-two size-class allocator** that carves
//! blocks out of a single growable byte region, the way a `malloc` built on
//! `sbrk` does.
//!
//! ## Overview
//!
//! Requests are rounded up to one of 20 classes. Each class keeps a singly
//! linked list of free blocks whose heads live in a table at the start of the
//! arena:
//!
//! ```text
//!   Arena Layout:
//!
//!   offset 0                160
//!   ┌──────────────────────┬────┬──────┬──────────┬─ ─ ─ ─ ─ ─┬────────────────┐
//!   │      bin table       │ c0 │  c1  │    c2    │           │      c19       │
//!   │ head of every class  │ 16 │  32  │    64    │           │       8M       │
//!   └──────────────────────┴────┴──────┴──────────┴─ ─ ─ ─ ─ ─┴────────────────┘
//!                          ◄──────────── blocks tile the rest ──────────────────►
//!
//!   alloc:   pop the request's class, or split the first larger non-empty one,
//!            or grow the arena by one block of every class.
//!   release: merge with an equal-sized free right neighbour, then push.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   binalloc
//!   ├── align      - Alignment macro and predicate (align!)
//!   ├── arena      - Arena trait and the Vec-backed VecArena
//!   ├── mmap       - MmapArena, a fixed-address anonymous mapping
//!   ├── block      - Block header layout and field access
//!   ├── class      - Size classes and request-to-class mapping
//!   ├── free_list  - Bin table and per-class list operations
//!   ├── heap       - Heap facade (alloc, release, realloc)
//!   ├── config     - HeapConfig diagnostics switches
//!   └── error      - AllocError, ArenaError, Corruption
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use binalloc::{Heap, VecArena};
//!
//! let mut heap = Heap::init(VecArena::new()).unwrap();
//!
//! let ptr = heap.alloc(10).unwrap();
//! heap.payload_mut(ptr).unwrap()[..5].copy_from_slice(b"hello");
//!
//! let ptr = heap.realloc(ptr, 100).unwrap();
//! assert_eq!(&heap.payload(ptr).unwrap()[..5], b"hello");
//!
//! heap.release(ptr).unwrap();
//! assert!(heap.integrity_check().is_ok());
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   ┌──────────────────────────────────┬─────────────────────────────┐
//!   │          Block Header            │          Payload            │
//!   │  ┌────────────┬──────┬───────┐   │                             │
//!   │  │ next (u64) │ size │ state │   │   2^(class+4) - 16 bytes    │
//!   │  │ NIL = !0   │ u32  │  u32  │   │                             │
//!   │  └────────────┴──────┴───────┘   │                             │
//!   │            16 bytes              │                             │
//!   └──────────────────────────────────┴─────────────────────────────┘
//!                                      ▲
//!                                      └── BlockPtr handed to the caller
//! ```
//!
//! Links and pointers are offsets from the start of the arena, so an arena
//! that moves when it grows ([`VecArena`]) works as well as one that does not
//! ([`MmapArena`]).
//!
//! ## Features
//!
//! - **Constant-time fast path**: a request whose class is non-empty is a pop
//! - **Splitting**: a larger block is carved into one free block per class
//! - **Right-neighbour merging**: one step per release
//! - **Misuse detection**: foreign pointers and double releases are rejected
//! - **Integrity check**: full walk of the tiling and every free list
//!
//! ## Limitations
//!
//! - **Single-threaded only**: every operation takes `&mut self`
//! - **No shrinking**: the arena is never returned to the provider
//! - **Largest request**: 8 MiB minus the header

pub mod align;
pub mod arena;
pub mod block;
mod check;
pub mod class;
mod coalesce;
pub mod config;
pub mod error;
pub mod free_list;
mod grow;
pub mod heap;
pub mod mmap;
mod split;

pub use arena::{Arena, VecArena};
pub use config::HeapConfig;
pub use error::{AllocError, AllocResult, ArenaError, Corruption};
pub use heap::{BlockPtr, Heap, HeapStats, INITIAL_ARENA_SIZE};
pub use mmap::MmapArena;
