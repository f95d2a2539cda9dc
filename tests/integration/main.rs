//! Integration tests for the runner
//!
//! These tests drive the full scheduling loop against a scripted in-memory
//! scraper, and the tunnel manager against shell scripts that mimic the
//! OpenVPN executable.

mod common;
mod runner_tests;
mod vpn_tests;
