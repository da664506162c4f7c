//! Built-in RTC driver scenario
//!
//! Exercises hwclock against the OPAL RTC driver: direct reads from each
//! `/dev/rtc*` file, setting the clock in every mode, syncing in both
//! directions, predict/debug/test modes, adjust and compare.
//!
//! The clock is left wherever the last exercise put it.

use crate::common::shell_quote;

use super::config::{Exercise, ModuleRequirement, TestScenario, TestStep};

pub const RTC_CONFIG_FLAG: &str = "CONFIG_RTC_DRV_OPAL";
pub const RTC_MODULE: &str = "rtc_opal";
pub const DEVICE_DIRECTORY: &str = "/dev";
pub const DEVICE_PATTERN: &str = "rtc";

/// Exit status of `timeout(1)` when the time limit was hit
pub const TIMEOUT_EXPIRED: i32 = 124;
/// Seconds `hwclock --compare` is left running
pub const COMPARE_SECS: u32 = 10;

fn set_date(time: &str) -> String {
    format!("hwclock --set --date {}", shell_quote(time))
}

/// `hwclock --set --date '<t>'`
pub fn set_time(time: &str) -> Exercise {
    Exercise::new("set-time", format!("Setting the hwclock to {}", time)).command(set_date(time))
}

/// `hwclock --set --date '<t>' --utc`
pub fn set_utc(time: &str) -> Exercise {
    Exercise::new("set-utc", format!("Setting the hwclock in UTC: {}", time))
        .command(format!("{} --utc", set_date(time)))
}

/// `hwclock --set --date '<t>' --localtime`
pub fn set_localtime(time: &str) -> Exercise {
    Exercise::new(
        "set-localtime",
        format!("Setting the hwclock in localtime: {}", time),
    )
    .command(format!("{} --localtime", set_date(time)))
}

pub fn systohc() -> Exercise {
    Exercise::new("systohc", "Setting the hwclock from system time").command("hwclock --systohc")
}

pub fn systohc_utc() -> Exercise {
    Exercise::new(
        "systohc-utc",
        "Setting the hwclock from system time, in UTC format",
    )
    .command("hwclock --systohc --utc")
}

pub fn systohc_localtime() -> Exercise {
    Exercise::new(
        "systohc-localtime",
        "Setting the hwclock from system time, in localtime format",
    )
    .command("hwclock --systohc --localtime")
}

pub fn hctosys() -> Exercise {
    Exercise::new("hctosys", "Setting the system time from hwclock").command("hwclock --hctosys")
}

pub fn keep_utc() -> Exercise {
    Exercise::new("keep-utc", "Keeping the hwclock in UTC format").command("hwclock --utc")
}

pub fn keep_localtime() -> Exercise {
    Exercise::new("keep-localtime", "Keeping the hwclock in localtime")
        .command("hwclock --localtime")
}

/// `hwclock --predict --date '<t>'`
pub fn predict(time: &str) -> Exercise {
    Exercise::new(
        "predict",
        format!("Testing the hwclock predict function to a time: {}", time),
    )
    .command(format!("hwclock --predict --date {}", shell_quote(time)))
}

pub fn debug_mode() -> Exercise {
    Exercise::new("debug-mode", "Testing the hwclock debug mode")
        .command("hwclock --systohc --debug")
        .command("hwclock --hctosys --debug")
}

/// `--test` goes through the motions without touching the clock
pub fn test_mode(time: &str) -> Exercise {
    Exercise::new(
        "test-mode",
        format!("Testing the hwclock test mode, set time to: {}", time),
    )
    .command(format!("{} --test", set_date(time)))
}

pub fn adjust() -> Exercise {
    Exercise::new("adjust", "Testing the hwclock adjust function")
        .command("hwclock --adjust")
        .diagnostic("cat /etc/adjtime")
}

/// `--compare` never returns on its own; being killed by timeout is the pass
pub fn compare() -> Exercise {
    Exercise::new(
        "compare",
        format!(
            "Testing hwclock compare functionality for a time of {} seconds",
            COMPARE_SECS
        ),
    )
    .expect(
        format!("timeout {} hwclock --compare", COMPARE_SECS),
        TIMEOUT_EXPIRED,
    )
}

/// The full RTC driver script
pub fn rtc_driver_scenario() -> TestScenario {
    let steps = vec![
        TestStep::ReadDeviceFiles {
            directory: DEVICE_DIRECTORY.to_string(),
            pattern: DEVICE_PATTERN.to_string(),
            expect_exit: 0,
        },
        TestStep::ReadHwclock,
        TestStep::Exercise(set_time("2015-01-01 10:10:10")),
        TestStep::Exercise(set_time("2016-01-01 20:20:20")),
        TestStep::Exercise(set_utc("2017-01-01 10:10:10")),
        TestStep::Exercise(set_localtime("2014-01-01 05:05:05")),
        TestStep::ReadSystime,
        TestStep::Exercise(systohc()),
        TestStep::Exercise(systohc_utc()),
        TestStep::Exercise(systohc_localtime()),
        TestStep::Exercise(hctosys()),
        TestStep::ReadSystime,
        TestStep::Exercise(keep_utc()),
        TestStep::Exercise(keep_localtime()),
        TestStep::Exercise(predict("2015-01-01 10:10:10")),
        TestStep::Exercise(debug_mode()),
        TestStep::Exercise(test_mode("2018-01-01 10:10:10")),
        TestStep::Exercise(adjust()),
        TestStep::Exercise(compare()),
    ];

    TestScenario {
        name: "RTC driver".to_string(),
        description: Some(
            "Reads, sets, syncs, predicts, adjusts and compares the hardware clock through hwclock"
                .to_string(),
        ),
        module: Some(ModuleRequirement {
            config_flag: RTC_CONFIG_FLAG.to_string(),
            module: RTC_MODULE.to_string(),
        }),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifteen_exercises_in_order() {
        let scenario = rtc_driver_scenario();
        scenario.validate().unwrap();

        let names: Vec<_> = scenario.exercises().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "set-time",
                "set-time",
                "set-utc",
                "set-localtime",
                "systohc",
                "systohc-utc",
                "systohc-localtime",
                "hctosys",
                "keep-utc",
                "keep-localtime",
                "predict",
                "debug-mode",
                "test-mode",
                "adjust",
                "compare",
            ]
        );
    }

    #[test]
    fn test_command_shapes() {
        assert_eq!(
            set_time("2015-01-01 10:10:10").commands[0].command,
            "hwclock --set --date '2015-01-01 10:10:10'"
        );
        assert_eq!(
            set_utc("2017-01-01 10:10:10").commands[0].command,
            "hwclock --set --date '2017-01-01 10:10:10' --utc"
        );
        assert_eq!(
            set_localtime("2014-01-01 05:05:05").commands[0].command,
            "hwclock --set --date '2014-01-01 05:05:05' --localtime"
        );
        assert_eq!(
            predict("2015-01-01 10:10:10").commands[0].command,
            "hwclock --predict --date '2015-01-01 10:10:10'"
        );
        assert_eq!(
            test_mode("2018-01-01 10:10:10").commands[0].command,
            "hwclock --set --date '2018-01-01 10:10:10' --test"
        );
    }

    #[test]
    fn test_only_compare_expects_nonzero() {
        let scenario = rtc_driver_scenario();
        for ex in scenario.exercises() {
            for cmd in &ex.commands {
                if ex.name == "compare" {
                    assert_eq!(cmd.command, "timeout 10 hwclock --compare");
                    assert_eq!(cmd.expect_exit, TIMEOUT_EXPIRED);
                } else {
                    assert_eq!(cmd.expect_exit, 0, "{}", ex.name);
                }
            }
        }
    }

    #[test]
    fn test_debug_mode_runs_both_directions() {
        let ex = debug_mode();
        assert_eq!(ex.commands.len(), 2);
        assert_eq!(ex.commands[0].command, "hwclock --systohc --debug");
        assert_eq!(ex.commands[1].command, "hwclock --hctosys --debug");
    }

    #[test]
    fn test_adjust_reads_adjtime_unasserted() {
        let ex = adjust();
        assert_eq!(ex.commands.len(), 1);
        assert_eq!(ex.diagnostics, vec!["cat /etc/adjtime".to_string()]);
    }

    #[test]
    fn test_systime_reads_follow_localtime_and_hctosys() {
        let scenario = rtc_driver_scenario();
        let positions: Vec<_> = scenario
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == TestStep::ReadSystime)
            .map(|(i, _)| scenario.steps[i - 1].label())
            .collect();
        assert_eq!(positions, vec!["set-localtime", "hctosys"]);
    }
}
