//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_suite::runner::{self, Outcome};
use ocprobe_utils::test::setup;

use crate::{config, testbed};

#[tokio::test(start_paused = true)]
async fn selected_cases() {
    setup();
    let sim = testbed();
    let names = ["bgp_establish", "linecard_reboot"].map(str::to_owned);
    let cases = runner::select(&names).unwrap();
    let report = runner::run(&sim.testbed(), &config(), &cases).await;
    assert!(report.success(), "{report}");
    let order = report
        .outcomes
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    assert_eq!(order, ["linecard_reboot", "bgp_establish"]);
    assert_eq!(report.passed(), 2);
}

#[tokio::test(start_paused = true)]
async fn skipped_case() {
    setup();
    let sim = testbed();
    let mut testbed = sim.testbed();
    testbed.dut2 = None;
    let names = ["bgp_establish".to_owned()];
    let cases = runner::select(&names).unwrap();
    let report = runner::run(&testbed, &config(), &cases).await;
    assert!(report.success());
    assert!(matches!(
        report.get("bgp_establish"),
        Some(Outcome::Skipped(..))
    ));
}
