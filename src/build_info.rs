/*
    Copyright 2023 github.com/programaquatic

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use serde::Serialize;

/// Build/VCS stamp, logged once at startup so a trajectory can be traced
/// back to the binary that produced it.
#[derive(Serialize, Debug)]
pub struct BuildInfo {
    pub timestamp: &'static str,
    pub opt_level: &'static str,
    pub target_triple: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
}

impl BuildInfo {
    pub fn collect() -> Self {
        BuildInfo {
            timestamp: env!("VERGEN_BUILD_TIMESTAMP"),
            opt_level: env!("VERGEN_CARGO_OPT_LEVEL"),
            target_triple: env!("VERGEN_CARGO_TARGET_TRIPLE"),
            commit: env!("VERGEN_GIT_SHA"),
            branch: env!("VERGEN_GIT_BRANCH"),
        }
    }

    pub fn log(&self) {
        log::info!(
            "dpd-bouncer {} ({}@{}, opt-level={}, target={})",
            self.timestamp,
            self.commit,
            self.branch,
            self.opt_level,
            self.target_triple
        );
    }
}
