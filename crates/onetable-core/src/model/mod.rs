//! Runtime data model.
//!
//! Types in `model` are built once at table setup and then shared read-only
//! by index selection, planning and the CRUD paths.
//!
//! In general:
//! - the record-type registry supplies *what exists* (`record`)
//! - setup derives *what runs* (`index`)

pub mod index;
pub mod record;
