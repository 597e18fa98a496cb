#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::float_cmp)]

pub mod client;

pub mod cl_camera;
pub mod cl_chase;
pub mod cl_director;
pub mod cl_ents;
pub mod cl_events;
pub mod cl_freeze;
pub mod cl_pred;
pub mod cl_spectator;
pub mod cl_view;
