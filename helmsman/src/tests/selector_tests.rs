use crate::selector::Selector;

#[test]
fn role_and_name_pipe_format() {
    assert_eq!(
        Selector::from("button|Sign In"),
        Selector::Role {
            role: "button".to_string(),
            name: Some("Sign In".to_string()),
        }
    );
    assert_eq!(
        Selector::from("role:heading|name:Setup Complete!"),
        Selector::Role {
            role: "heading".to_string(),
            name: Some("Setup Complete!".to_string()),
        }
    );
}

#[test]
fn bare_role_prefix() {
    assert_eq!(
        Selector::from("role:heading"),
        Selector::Role {
            role: "heading".to_string(),
            name: None,
        }
    );
}

#[test]
fn placeholder_and_text_prefixes() {
    assert_eq!(
        Selector::from("placeholder:Your password"),
        Selector::Placeholder("Your password".to_string())
    );
    assert_eq!(
        Selector::from("text:Timeline"),
        Selector::Text {
            text: "Timeline".to_string(),
            exact: false,
        }
    );
    assert_eq!(
        Selector::from("text=10"),
        Selector::Text {
            text: "10".to_string(),
            exact: true,
        }
    );
}

#[test]
fn css_with_nth_chain() {
    let parsed = Selector::from("css:input[type='checkbox'] >> nth=1");
    assert_eq!(
        parsed,
        Selector::Chain(vec![
            Selector::Css("input[type='checkbox']".to_string()),
            Selector::Nth(1),
        ])
    );
}

#[test]
fn nth_builder_flattens_into_chains() {
    let chained = Selector::css("input[type='checkbox']").nth(0).nth(1);
    assert_eq!(
        chained,
        Selector::Chain(vec![
            Selector::Css("input[type='checkbox']".to_string()),
            Selector::Nth(0),
            Selector::Nth(1),
        ])
    );
}

#[test]
fn unknown_format_is_invalid_not_a_panic() {
    assert!(matches!(Selector::from("¯\\_(ツ)_/¯"), Selector::Invalid(_)));
    assert!(matches!(Selector::from("nth=abc"), Selector::Invalid(_)));
}

#[test]
fn display_round_trips_simple_selectors() {
    for raw in [
        "button|Sign In",
        "placeholder:Email",
        "text:Timeline",
        "text=10",
        "css:input[type='checkbox']",
    ] {
        let parsed = Selector::from(raw);
        assert_eq!(Selector::from(parsed.to_string().as_str()), parsed, "{raw}");
    }
}
