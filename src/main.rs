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

use clap::Parser;

use dpd_bouncer::build_info::BuildInfo;
use dpd_bouncer::config::{Cli, SimulationConfig};
use dpd_bouncer::driver::Driver;

fn main() {
    env_logger::init();

    BuildInfo::collect().log();

    let cli = Cli::parse();
    let config = match SimulationConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    log::info!("resolved configuration: {config:?}");

    let mut driver = Driver::new(config);
    if let Err(e) = driver.run() {
        log::error!("{e}");
        std::process::exit(e.exit_code());
    }
}
