use packsmith::settings::{merge_settings, parse_var, settings_to_map};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_parse_var() {
    assert_eq!(parse_var("boot_wait = 5s"), ("boot_wait", "5s"));
    assert_eq!(parse_var("key=value"), ("key", "value"));
    assert_eq!(parse_var(""), ("", ""));
    assert_eq!(parse_var("key="), ("key", ""));
    assert_eq!(parse_var("novalue"), ("novalue", ""));
    assert_eq!(
        parse_var("execute_command = echo a=b"),
        ("execute_command", "echo a=b")
    );
}

#[test]
fn test_merge_settings_both_empty() {
    assert_eq!(merge_settings(&[], &[]), None);
}

#[test]
fn test_merge_settings_empty_overlay() {
    let base = strings(&["ssh_port = 22", "boot_wait = 5s"]);
    assert_eq!(merge_settings(&base, &[]), Some(base.clone()));
}

#[test]
fn test_merge_settings_empty_base() {
    let overlay = strings(&["ssh_port = 22"]);
    assert_eq!(merge_settings(&[], &overlay), Some(overlay.clone()));
}

#[test]
fn test_merge_settings_overwrites_in_place() {
    let base = strings(&["ssh_port = 22", "boot_wait = 5s", "headless = true"]);
    let overlay = strings(&["disk_size = 20000", "boot_wait=10s", "vm_name = test"]);
    let merged = merge_settings(&base, &overlay).unwrap();
    assert_eq!(
        merged,
        strings(&[
            "ssh_port = 22",
            "boot_wait=10s",
            "headless = true",
            "disk_size = 20000",
            "vm_name = test",
        ])
    );
}

#[test]
fn test_merge_settings_no_duplicate_keys() {
    let base = strings(&["a=1", "b=2"]);
    let overlay = strings(&["c=3", "a=4", "c=5"]);
    let merged = merge_settings(&base, &overlay).unwrap();
    assert_eq!(merged, strings(&["a=4", "b=2", "c=5"]));

    let map = settings_to_map(&merged);
    assert_eq!(map.len(), 3);
}

#[test]
fn test_merge_settings_keeps_unset_entry() {
    let base = strings(&["ssh_password = vagrant"]);
    let overlay = strings(&["ssh_password ="]);
    let merged = merge_settings(&base, &overlay).unwrap();
    assert_eq!(merged, strings(&["ssh_password ="]));
}

#[test]
fn test_merge_settings_leaves_inputs_untouched() {
    let base = strings(&["a=1"]);
    let overlay = strings(&["a=2"]);
    let _ = merge_settings(&base, &overlay);
    assert_eq!(base, strings(&["a=1"]));
    assert_eq!(overlay, strings(&["a=2"]));
}
