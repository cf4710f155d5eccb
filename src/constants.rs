/// Directory where the kernel exposes evdev device nodes
pub const INPUT_PATH: &str = "/dev/input";
/// Prefix of evdev device node names (e.g. "event12")
pub const EVENT_DEVICE_PREFIX: &str = "event";
/// Name of the input loop thread
pub const INPUT_THREAD_NAME: &str = "tablet-input";
/// Default upper bound on how long the input loop waits for kernel events
/// before checking whether it should stop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;
/// Upper bound on the input loop wait so stopping stays responsive
pub const MAX_POLL_INTERVAL_MS: u64 = 100;
