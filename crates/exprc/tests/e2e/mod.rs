mod fallback;
mod harness;
mod literals;
mod control_flow;
mod registry_dedup;
