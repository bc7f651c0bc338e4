//! Domain entities for syncinput.
//!
//! This module contains pure data types with no infrastructure dependencies.
//! The input backend speaks in terms of these types, so the session engine
//! and the target tracker can be tested without a real window system.

/// Window identifiers, placement rectangles and the capture area.
pub mod window;
