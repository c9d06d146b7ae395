// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.

//! Two-level build scheduler: an outer master that gates each tile's
//! build task on its dependencies, and a bounded pool of preemptive
//! worker threads that run the ready tasks in parallel.

mod master;
mod message;
mod pool;

pub use master::Master;
pub use message::{TileJob, TileOutcome};
pub use pool::{WorkerPool, IDLE_SLEEP, LONG_TASK_WARN_SEC};
