//! Onyx Benchmarks
//!
//! Lexer and parser throughput over the programs in `fixtures/`.
//! Run with: cargo bench -p onyx-benchmarks

// Cargo needs a lib target; the benchmarks live in benches/parser_benchmarks.rs
