use hotp_key_pc::{
    authenticator::Authenticator,
    credential::RECORD_SIZE,
    oracle::ChaChaOracle,
    platform::{console, store::Store, Platform},
    Error,
};

const DEVICE_KEY: [u8; 32] = [0x42; 32];

fn board(store: Store, script: &str) -> Platform {
    Platform::new(store, console::Input::script(script), console::Output::captured(), 4)
}

fn device(script: &str) -> Authenticator<ChaChaOracle> {
    Authenticator::new(board(Store::in_memory(), script), ChaChaOracle::new(DEVICE_KEY))
}

fn transcript(app: &Authenticator<ChaChaOracle>) -> String {
    app.platform().console.transcript().unwrap()
}

#[test]
fn fresh_device_types_the_default_codes() {
    let mut app = device("press 0\npress 0\n");
    app.run().unwrap();

    let out = transcript(&app);
    assert!(out.contains("Programmed slot 0"));
    assert!(out.contains("* Press a button to get the next HOTP code for that slot."));
    let first = out.find("CODE: 750359").unwrap();
    let second = out.find("CODE: 725505").unwrap();
    assert!(first < second);
    assert_eq!(app.credentials()[0].counter(), 2);
    assert!(!app.platform().leds.is_on(0));
}

#[test]
fn unconfigured_slot_is_reported_and_untouched() {
    let mut app = device("press 2\n");
    let writes = app.platform().kv.store().writes();
    app.run().unwrap();

    assert!(transcript(&app).contains("HOTP slot 2 not yet configured."));
    assert_eq!(app.platform().hmac.runs(), 0);
    assert_eq!(app.platform().kv.store().writes(), writes);
    assert_eq!(app.credentials()[2].counter(), 0);
    assert!(!app.credentials()[2].is_configured());
}

#[test]
fn holding_a_button_programs_its_slot() {
    let mut app = device("hold 1\nABCDEF\npress 1\n");
    app.run().unwrap();

    let out = transcript(&app);
    assert!(out.contains("Program a new key in slot 1"));
    assert!(out.contains("ABCDEF\r\nProgrammed slot 1"));
    assert!(out.contains("CODE: 220843"));

    let credential = app.credential(1).unwrap();
    assert!(credential.is_configured());
    assert_eq!(credential.secret_len(), 3);
    assert_eq!(credential.counter(), 1);
    let record = app.platform().kv.store().get(b"hotp-key-1").unwrap();
    assert_eq!(record.len(), RECORD_SIZE);
    assert_eq!(record[0], 3);
}

#[test]
fn reprogramming_resets_the_counter() {
    let mut app = device("press 0\nhold 0\ntest\npress 0\n");
    app.run().unwrap();

    let out = transcript(&app);
    assert_eq!(out.matches("CODE: 750359").count(), 2);
    assert_eq!(app.credentials()[0].counter(), 1);
}

#[test]
fn empty_entry_aborts_programming() {
    let mut app = device("press 0\nhold 0\n\n");
    app.run().unwrap();

    assert!(transcript(&app).contains("Aborted"));
    assert!(app.credentials()[0].is_configured());
    assert_eq!(app.credentials()[0].counter(), 1);
}

#[test]
fn invalid_secret_leaves_the_slot_unconfigured() {
    let mut app = device("hold 3\n0189\npress 3\n");
    app.run().unwrap();

    let out = transcript(&app);
    assert!(out.contains("ERROR cannot base32 decode secret"));
    assert!(out.contains("HOTP slot 3 not yet configured."));
    assert!(!app.credentials()[3].is_configured());
    // only the four blank slots and the default secret were ever written
    assert_eq!(app.platform().kv.store().writes(), 5);
}

#[test]
fn codes_never_repeat_within_a_slot() {
    let mut app = device("");
    app.program_secret(2, "JBSWY3DPEHPK3PXP").unwrap();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        let otp = app.emit_code(2).unwrap();
        assert_eq!(otp.digits(), 7);
        assert!(seen.insert(otp.value()));
    }
    assert_eq!(app.credentials()[2].counter(), 50);
}

#[test]
fn codes_are_typed_on_the_keyboard() {
    let platform = board(Store::in_memory(), "press 0\n").with_keyboard();
    let mut app = Authenticator::new(platform, ChaChaOracle::new(DEVICE_KEY));
    app.run().unwrap();

    let keyboard = app.platform().keyboard.as_ref().unwrap();
    assert_eq!(keyboard.typed(), ["750359".to_string()]);
    let out = transcript(&app);
    assert!(out.contains("Counter: 0. Typed \"750359\" on the USB HID keyboard"));
    assert!(!out.contains("CODE:"));
}

#[test]
fn failed_counter_save_still_delivers() {
    let mut app = device("press 0\n");
    app.platform_mut().kv.store_mut().set_read_only(true);
    app.run().unwrap();

    let out = transcript(&app);
    assert!(out.contains("ERROR(-1): Unknown Error."));
    assert!(out.contains("CODE: 750359"));
    assert_eq!(app.credentials()[0].counter(), 1);
}

#[test]
fn buttons_without_a_slot() {
    let platform = Platform::new(
        Store::in_memory(),
        console::Input::script("press 4\npress 0\n"),
        console::Output::captured(),
        5,
    );
    let mut app = Authenticator::new(platform, ChaChaOracle::new(DEVICE_KEY));
    assert_eq!(app.emit_code(4), Err(Error::InvalidSlot(4)));
    app.run().unwrap();

    let out = transcript(&app);
    assert!(out.contains("ERROR: no credential slot for button 4"));
    assert!(out.contains("CODE: 750359"));
}

#[test]
fn counters_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");

    let mut app = Authenticator::new(
        board(Store::open(&path).unwrap(), "hold 1\nABCDEF\npress 1\n"),
        ChaChaOracle::new(DEVICE_KEY),
    );
    app.run().unwrap();
    assert!(transcript(&app).contains("CODE: 220843"));
    drop(app);

    let mut app = Authenticator::new(
        board(Store::open(&path).unwrap(), "press 1\npress 0\n"),
        ChaChaOracle::new(DEVICE_KEY),
    );
    app.run().unwrap();

    let out = transcript(&app);
    assert!(!out.contains("Programmed slot 0"));
    assert!(out.contains("CODE: 377003"));
    assert!(out.contains("CODE: 750359"));
    assert_eq!(app.credentials()[1].counter(), 2);
}

#[test]
fn exhausted_input_while_programming_ends_the_run() {
    let mut app = device("hold 2\nAB");
    assert_eq!(app.run(), Ok(()));
    assert!(!app.credentials()[2].is_configured());
}
