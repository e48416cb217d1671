//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! OpenConfig path builders.

use crate::oc::InstallProtocol;
use crate::path::{Path, WILDCARD};

pub const DEFAULT_NETWORK_INSTANCE: &str = "default";

pub mod interfaces {
    use super::*;

    pub fn interface(name: &str) -> Path {
        Path::root().elem("interfaces").keyed("interface", "name", name)
    }

    pub fn config(name: &str) -> Path {
        interface(name).elem("config")
    }

    pub fn state(name: &str) -> Path {
        interface(name).elem("state")
    }

    pub fn oper_status(name: &str) -> Path {
        state(name).elem("oper-status")
    }

    pub fn oper_status_any() -> Path {
        oper_status(WILDCARD)
    }

    pub fn enabled(name: &str) -> Path {
        config(name).elem("enabled")
    }

    // P4Runtime port identifier.
    pub fn id(name: &str) -> Path {
        config(name).elem("id")
    }

    pub fn id_state(name: &str) -> Path {
        state(name).elem("id")
    }

    pub fn hardware_port(name: &str) -> Path {
        state(name).elem("hardware-port")
    }

    pub fn ipv4_address(name: &str, index: u32, ip: &str) -> Path {
        interface(name)
            .elem("subinterfaces")
            .keyed("subinterface", "index", index)
            .elem("ipv4")
            .elem("addresses")
            .keyed("address", "ip", ip)
            .elem("config")
    }

    pub fn ipv6_address(name: &str, index: u32, ip: &str) -> Path {
        interface(name)
            .elem("subinterfaces")
            .keyed("subinterface", "index", index)
            .elem("ipv6")
            .elem("addresses")
            .keyed("address", "ip", ip)
            .elem("config")
    }

    pub fn subinterface_enabled(name: &str, index: u32) -> Path {
        interface(name)
            .elem("subinterfaces")
            .keyed("subinterface", "index", index)
            .elem("ipv4")
            .elem("config")
            .elem("enabled")
    }
}

pub mod components {
    use super::*;

    pub fn component(name: &str) -> Path {
        Path::root().elem("components").keyed("component", "name", name)
    }

    pub fn state(name: &str) -> Path {
        component(name).elem("state")
    }

    pub fn name_any() -> Path {
        state(WILDCARD).elem("name")
    }

    pub fn component_type(name: &str) -> Path {
        state(name).elem("type")
    }

    pub fn type_any() -> Path {
        component_type(WILDCARD)
    }

    pub fn redundant_role(name: &str) -> Path {
        state(name).elem("redundant-role")
    }

    pub fn removable(name: &str) -> Path {
        state(name).elem("removable")
    }

    pub fn oper_status(name: &str) -> Path {
        state(name).elem("oper-status")
    }

    pub fn parent(name: &str) -> Path {
        state(name).elem("parent")
    }

    pub fn last_reboot_time(name: &str) -> Path {
        state(name).elem("last-reboot-time")
    }

    // P4Runtime device identifier of an integrated circuit.
    pub fn node_id(name: &str) -> Path {
        component(name)
            .elem("integrated-circuit")
            .elem("config")
            .elem("node-id")
    }
}

pub mod system {
    use super::*;

    pub fn hostname() -> Path {
        Path::root().elem("system").elem("config").elem("hostname")
    }

    pub fn hostname_state() -> Path {
        Path::root().elem("system").elem("state").elem("hostname")
    }

    // Observable fed by RebootStatus polling. Not part of the device tree.
    pub fn reboot_active() -> Path {
        Path::root().elem("system").elem("reboot-status").elem("active")
    }
}

pub mod lldp {
    use super::*;

    pub fn enabled() -> Path {
        Path::root().elem("lldp").elem("config").elem("enabled")
    }
}

pub mod network_instance {
    use super::*;

    pub fn instance(name: &str) -> Path {
        Path::root()
            .elem("network-instances")
            .keyed("network-instance", "name", name)
    }

    pub fn protocol(ni: &str, identifier: InstallProtocol, name: &str) -> Path {
        instance(ni)
            .elem("protocols")
            .keyed("protocol", "identifier", identifier.as_str())
            .with_key("name", name)
    }
}

pub mod bgp {
    use super::*;

    pub const PROTOCOL_NAME: &str = "BGP";

    pub fn bgp(ni: &str) -> Path {
        network_instance::protocol(ni, InstallProtocol::Bgp, PROTOCOL_NAME)
            .elem("bgp")
    }

    pub fn global_config(ni: &str) -> Path {
        bgp(ni).elem("global").elem("config")
    }

    pub fn neighbor(ni: &str, address: &str) -> Path {
        bgp(ni)
            .elem("neighbors")
            .keyed("neighbor", "neighbor-address", address)
    }

    pub fn neighbor_config(ni: &str, address: &str) -> Path {
        neighbor(ni, address).elem("config")
    }

    pub fn session_state(ni: &str, address: &str) -> Path {
        neighbor(ni, address).elem("state").elem("session-state")
    }
}

pub mod static_routes {
    use super::*;

    pub const PROTOCOL_NAME: &str = "static";

    pub fn static_routes(ni: &str) -> Path {
        network_instance::protocol(ni, InstallProtocol::Static, PROTOCOL_NAME)
            .elem("static-routes")
    }

    pub fn route(ni: &str, prefix: &str) -> Path {
        static_routes(ni).keyed("static", "prefix", prefix)
    }

    pub fn next_hop_config(ni: &str, prefix: &str, index: &str) -> Path {
        route(ni, prefix)
            .elem("next-hops")
            .keyed("next-hop", "index", index)
            .elem("config")
    }
}

pub mod qos {
    use super::*;

    pub fn qos() -> Path {
        Path::root().elem("qos")
    }

    pub fn queue(name: &str) -> Path {
        qos().elem("queues").keyed("queue", "name", name)
    }

    pub fn forwarding_group(name: &str) -> Path {
        qos()
            .elem("forwarding-groups")
            .keyed("forwarding-group", "name", name)
    }

    pub fn classifier(name: &str) -> Path {
        qos().elem("classifiers").keyed("classifier", "name", name)
    }

    pub fn classifier_term(name: &str, term: &str) -> Path {
        classifier(name).elem("terms").keyed("term", "id", term)
    }

    pub fn queue_config(name: &str) -> Path {
        queue(name).elem("config")
    }

    pub fn forwarding_group_config(name: &str) -> Path {
        forwarding_group(name).elem("config")
    }

    pub fn classifier_config(name: &str) -> Path {
        classifier(name).elem("config")
    }

    pub fn classifier_term_config(name: &str, term: &str) -> Path {
        classifier_term(name, term).elem("config")
    }

    // DSCP values matched by a classifier term (`ipv4` or `ipv6`).
    pub fn term_dscp_set(name: &str, term: &str, family: &str) -> Path {
        classifier_term(name, term)
            .elem("conditions")
            .elem(family)
            .elem("config")
            .elem("dscp-set")
    }

    pub fn term_target_group(name: &str, term: &str) -> Path {
        classifier_term(name, term)
            .elem("actions")
            .elem("config")
            .elem("target-group")
    }

    pub fn scheduler_policy(name: &str) -> Path {
        qos()
            .elem("scheduler-policies")
            .keyed("scheduler-policy", "name", name)
    }

    pub fn scheduler(policy: &str, sequence: u32) -> Path {
        scheduler_policy(policy)
            .elem("schedulers")
            .keyed("scheduler", "sequence", sequence)
    }

    pub fn scheduler_input(policy: &str, sequence: u32, input: &str) -> Path {
        scheduler(policy, sequence)
            .elem("inputs")
            .keyed("input", "id", input)
    }

    pub fn scheduler_config(policy: &str, sequence: u32) -> Path {
        scheduler(policy, sequence).elem("config")
    }

    pub fn scheduler_input_config(
        policy: &str,
        sequence: u32,
        input: &str,
    ) -> Path {
        scheduler_input(policy, sequence, input).elem("config")
    }

    pub fn interface(id: &str) -> Path {
        qos().elem("interfaces").keyed("interface", "interface-id", id)
    }

    pub fn interface_config(id: &str) -> Path {
        interface(id).elem("config")
    }

    // Input classifier of the given type (`IPV4`, `IPV6`, ...).
    pub fn input_classifier_config(id: &str, kind: &str) -> Path {
        interface(id)
            .elem("input")
            .elem("classifiers")
            .keyed("classifier", "type", kind)
            .elem("config")
    }

    pub fn output_scheduler_policy(id: &str) -> Path {
        interface(id)
            .elem("output")
            .elem("scheduler-policy")
            .elem("config")
            .elem("name")
    }

    pub fn output_queue_config(id: &str, queue: &str) -> Path {
        interface(id)
            .elem("output")
            .elem("queues")
            .keyed("queue", "name", queue)
            .elem("config")
    }

    pub fn interface_queue(id: &str, queue: &str) -> Path {
        interface(id)
            .elem("output")
            .elem("queues")
            .keyed("queue", "name", queue)
            .elem("state")
    }

    pub fn transmit_pkts(id: &str, queue: &str) -> Path {
        interface_queue(id, queue).elem("transmit-pkts")
    }

    pub fn dropped_pkts(id: &str, queue: &str) -> Path {
        interface_queue(id, queue).elem("dropped-pkts")
    }
}

pub mod flows {
    use super::*;

    pub fn state(name: &str) -> Path {
        Path::root().elem("flows").keyed("flow", "name", name).elem("state")
    }

    pub fn out_pkts(name: &str) -> Path {
        state(name).elem("counters").elem("out-pkts")
    }

    pub fn in_pkts(name: &str) -> Path {
        state(name).elem("counters").elem("in-pkts")
    }

    pub fn out_octets(name: &str) -> Path {
        state(name).elem("counters").elem("out-octets")
    }

    pub fn in_octets(name: &str) -> Path {
        state(name).elem("counters").elem("in-octets")
    }

    pub fn loss_pct(name: &str) -> Path {
        state(name).elem("loss-pct")
    }
}

// ===== unit tests =====
