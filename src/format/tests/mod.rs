//! Tests for the label-file codec.
//!
//! These cover the persisted-format contract: exact layout of saved lines,
//! lossless save/load cycles and the skip-and-count handling of bad input.
