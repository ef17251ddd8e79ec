// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod db;
pub mod error;
pub mod models;
pub mod utils;
pub mod identity;
pub mod period;
pub mod buckets;
pub mod ledger;
pub mod store;
pub mod aggregate;
pub mod commands;
