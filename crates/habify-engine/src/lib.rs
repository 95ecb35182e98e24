//! Streak and reward rules for daily habit submissions.
//!
//! Everything in this crate is pure: callers pass in the stored standing of
//! a user, the submitted activity and the calendar date, and get back the
//! new standing plus a description of what happened. Persistence lives in
//! `habify-db`.

pub mod badge;
pub mod streak;

pub use badge::{Badge, BadgeColor, TIERS, Tier};
pub use streak::{
    Activity, Outcome, ResubmitPolicy, Standing, Submission, Transition, apply, gap_detected,
};
