//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use itertools::Itertools;
use ocprobe_device::gnoi::{RebootMethod, RebootRequest, RebootStatusRequest};
use ocprobe_device::{Dut, Testbed};
use ocprobe_telemetry::client::{get_all, lookup};
use ocprobe_telemetry::oc::{
    ComponentType, HardwareComponent, OperStatus, RedundantRole,
};
use ocprobe_telemetry::paths::{components, interfaces, system};
use ocprobe_telemetry::{Code, Gnmi, Path};
use ocprobe_watch::{
    ErrorPolicy, PollConfig, PollSource, Verdict, Watch, WatchError,
    all_equal, await_value, equals, present, watch, watch_all,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::CaseError;

// Reboots the standby controller card and waits for it to come back with a
// redundant role.
pub async fn standby_controller_card_reboot(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let gnmi = &*dut.gnmi;

    let supervisors =
        find_components(gnmi, HardwareComponent::ControllerCard).await?;
    if supervisors.len() != 2 {
        return Err(CaseError::skipped(format!(
            "{} {} has {} controller cards, dual supervisor required",
            dut.vendor,
            dut.model,
            supervisors.len()
        )));
    }

    let (primary, standby) = find_standby(&supervisors, gnmi, config).await?;
    info!(%primary, %standby, "found controller cards");

    reboot(dut, &standby).await?;
    let start = Instant::now();

    let path = components::redundant_role(&standby);
    let role = watch::<RedundantRole, _>(
        gnmi,
        &path,
        present(),
        config.watch_within(config.timeouts.controller_reboot),
    )
    .await?
    .await_converged()
    .await?;
    info!(
        component = %standby,
        role = ?role.value(),
        boot_time = ?start.elapsed(),
        "standby controller card is back"
    );

    Ok(())
}

// Reboots a removable line card and checks that every interface that was up
// before the reboot comes back up.
pub async fn linecard_reboot(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let gnmi = &*dut.gnmi;

    let linecards = find_components(gnmi, HardwareComponent::Linecard).await?;
    let mut removable = None;
    for linecard in &linecards {
        let sample = lookup::<bool>(gnmi, &components::removable(linecard))
            .await?;
        if sample.value() == Some(&true) {
            removable = Some(linecard);
            break;
        }
        debug!(component = %linecard, "skipping non-removable line card");
    }
    let Some(linecard) = removable else {
        return Err(CaseError::failed(format!(
            "no removable line card among {linecards:?}"
        )));
    };
    info!(component = %linecard, "found removable line card");

    let up_before = up_interfaces(gnmi).await?;
    debug!(interfaces = ?up_before, "interfaces up before reboot");

    reboot(dut, linecard).await?;
    let start = Instant::now();

    await_reboot_complete(dut, config).await?;
    info!(elapsed = ?start.elapsed(), "reboot status is no longer active");

    await_value(
        gnmi,
        &components::removable(linecard),
        true,
        config.watch_within(config.timeouts.linecard_boot),
    )
    .await?;
    info!(
        component = %linecard,
        boot_time = ?start.elapsed(),
        "line card is back"
    );

    if !up_before.is_empty() {
        let paths = up_before
            .iter()
            .map(|name| interfaces::oper_status(name))
            .collect::<Vec<_>>();
        watch_all::<OperStatus, _>(
            gnmi,
            &paths,
            all_equal(OperStatus::Up),
            config.watch_within(config.timeouts.oper_status),
        )
        .await?
        .await_converged()
        .await?;
    }

    let up_after = up_interfaces(gnmi).await?;
    if up_after != up_before {
        return Err(CaseError::failed(format!(
            "interfaces up before reboot {up_before:?}, after {up_after:?}"
        )));
    }

    Ok(())
}

// ===== helper functions =====

// Names of the hardware components of the given kind.
async fn find_components(
    gnmi: &dyn Gnmi,
    kind: HardwareComponent,
) -> Result<Vec<String>, CaseError> {
    let mut found = vec![];
    for (_, name) in get_all::<String>(gnmi, &components::name_any()).await? {
        let sample =
            lookup::<ComponentType>(gnmi, &components::component_type(&name))
                .await?;
        match sample.value() {
            None => {
                debug!(component = %name, "component has no type");
            }
            Some(other @ ComponentType::Software(..)) => {
                return Err(CaseError::failed(format!(
                    "expected hardware component {name}, got {other}"
                )));
            }
            Some(ComponentType::Hardware(hw)) if *hw == kind => {
                found.push(name);
            }
            Some(..) => (),
        }
    }
    Ok(found)
}

// Returns the primary and standby controller cards.
async fn find_standby(
    supervisors: &[String],
    gnmi: &dyn Gnmi,
    config: &Config,
) -> Result<(String, String), CaseError> {
    let mut primary = None;
    let mut standby = None;
    for name in supervisors {
        let sample = watch::<RedundantRole, _>(
            gnmi,
            &components::redundant_role(name),
            present(),
            config.watch_within(config.timeouts.role_present),
        )
        .await?
        .await_converged()
        .await?;
        match sample.value() {
            Some(RedundantRole::Primary) => primary = Some(name.clone()),
            Some(RedundantRole::Secondary) => standby = Some(name.clone()),
            role => {
                return Err(CaseError::failed(format!(
                    "unexpected redundant role {role:?} on {name}"
                )));
            }
        }
    }

    match (primary, standby) {
        (Some(primary), Some(standby)) => Ok((primary, standby)),
        (primary, standby) => Err(CaseError::failed(format!(
            "expected one primary and one standby controller card, \
             got primary {primary:?} and standby {standby:?}"
        ))),
    }
}

// Names of the interfaces whose operational status is up, sorted.
async fn up_interfaces(gnmi: &dyn Gnmi) -> Result<Vec<String>, CaseError> {
    let statuses =
        get_all::<OperStatus>(gnmi, &interfaces::oper_status_any()).await?;
    let up = statuses
        .into_iter()
        .filter(|(_, status)| *status == OperStatus::Up)
        .filter_map(|(path, _)| {
            path.key("interface", "name").map(str::to_owned)
        })
        .sorted()
        .collect();
    Ok(up)
}

async fn reboot(dut: &Dut, component: &str) -> Result<(), CaseError> {
    info!(%component, "requesting cold reboot");
    let request = RebootRequest::new(RebootMethod::Cold, "")
        .with_subcomponent(Path::root().elem(component));
    dut.system.reboot(request).await?;
    Ok(())
}

// Polls RebootStatus until no reboot is reported as active. Transient poll
// failures are tolerated until the deadline.
async fn await_reboot_complete(
    dut: &Dut,
    config: &Config,
) -> Result<(), CaseError> {
    let path = system::reboot_active();
    let service = dut.system.clone();
    let source =
        PollSource::new(path.clone(), reboot_poll(config), move || {
            let service = service.clone();
            async move {
                let status = service
                    .reboot_status(RebootStatusRequest::default())
                    .await?;
                Ok(Some(status.active.into()))
            }
        });

    let watch_config = config
        .watch_within(config.timeouts.linecard_boot)
        .with_error_policy(ErrorPolicy::Tolerate {
            max_consecutive: u32::MAX,
        });
    let result = Watch::<bool>::start(
        path,
        source.into_stream(),
        equals(false),
        watch_config,
    )?
    .await_verdict()
    .await;
    match result {
        Ok(Verdict::Converged(_)) => Ok(()),
        // The removable leaf decides whether the line card came back.
        Ok(Verdict::TimedOut(last)) => {
            warn!(
                last = ?last.map(|sample| sample.to_string()),
                "reboot status still active, continuing"
            );
            Ok(())
        }
        Err(WatchError::Source(error))
            if error.code() == Code::Unimplemented =>
        {
            Err(CaseError::failed(format!(
                "RebootStatus is not implemented: {error}"
            )))
        }
        Err(error) => Err(error.into()),
    }
}

// RebootStatus is first queried one interval after the reboot request.
fn reboot_poll(config: &Config) -> PollConfig {
    PollConfig {
        tick_on_start: false,
        ..config.poll
    }
}

// ===== unit tests =====
