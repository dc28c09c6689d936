// Business logic services layer
//
// This module contains the platform-facing services used by the merge
// workflow and the CLI front-end.

pub mod dedupe;
