// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod submission_store;

pub use submission_store::{
    FlowSubmission, SubmissionQuery, SubmissionSink, SubmissionStore, SubmissionStoreStats,
    DEFAULT_CAPACITY, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
