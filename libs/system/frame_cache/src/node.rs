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
use nalgebra::Isometry3;

/// A single frame in the observation/site-drive/site/root hierarchy:
/// its transform into its parent frame, as known prior to bundle
/// adjustment and, once available, as corrected by it.
#[derive(Clone, Debug)]
pub struct FrameNode {
    pub parent: Option<String>,
    pub prior: Isometry3<f64>,
    pub adjusted: Option<Isometry3<f64>>,
}

impl FrameNode {
    pub fn root(prior: Isometry3<f64>) -> Self {
        Self { parent: None, prior, adjusted: None }
    }

    pub fn child_of(parent: impl Into<String>, prior: Isometry3<f64>) -> Self {
        Self { parent: Some(parent.into()), prior, adjusted: None }
    }

    /// The transform actually used for composition: the bundle-adjusted
    /// one if present, otherwise the prior estimate.
    pub fn effective(&self) -> &Isometry3<f64> {
        self.adjusted.as_ref().unwrap_or(&self.prior)
    }
}
