use super::Downloader;
use super::test_helpers::{
    Gate, ScriptedFetcher, create_test_downloader, create_test_downloader_with, wait_for_job,
    wait_for_terminal,
};
use crate::error::{Error, JobError};
use crate::fetcher::ProgressEvent;
use crate::types::{DownloadOptions, DownloadType, Event, JobStatus};
use std::sync::Arc;
use std::time::Duration;
