use pretty_assertions::assert_eq;
use rbe::{Bundle, BundleGroup, ChangeEvent, Entry, KeyTree, Locale, Updater};
use std::{cell::RefCell, rc::Rc};

fn three_locales() -> BundleGroup {
    let mut group = BundleGroup::new();
    group.add_bundle(
        Locale::root(),
        Bundle::with_entries([
            Entry::new("a.b", "Base").with_comment("# shown in header\n"),
            Entry::new("a.x", "X"),
        ]),
    );
    group.add_bundle(
        Locale::language("de"),
        Bundle::with_entries([Entry::new("a.b", "Basis"), Entry::new("z", "Zett")]),
    );
    group.add_bundle(
        Locale::new("pt", "br", ""),
        Bundle::with_entries([Entry::new("a.b", "Base BR").with_commented(true)]),
    );
    group
}

#[test]
fn keys_are_the_sorted_union_across_locales() {
    let group = three_locales();
    assert_eq!(group.keys(), vec!["a.b", "a.x", "z"]);

    let slots: Vec<Option<&str>> = group
        .bundle_entries("z")
        .into_iter()
        .map(|slot| slot.map(|e| e.value.as_str()))
        .collect();
    assert_eq!(slots, vec![None, Some("Zett"), None]);

    assert_eq!(group.next_key("a.x").as_deref(), Some("z"));
    assert_eq!(group.next_key("z"), None);
    assert_eq!(group.previous_key("a.b"), None);
}

#[test]
fn rename_propagates_to_every_locale_and_the_tree() {
    let mut group = three_locales();
    let mut tree = KeyTree::new(Updater::grouped("."), &group);

    let modified = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&modified);
    group.add_listener(move |event| {
        if let ChangeEvent::Modified(bundle) = event {
            sink.borrow_mut().push(bundle.locale().map(Locale::to_string));
        }
    });

    group.rename_key("a.b", "a.c");
    if !group.is_key("a.b") {
        tree.remove_key("a.b");
    }
    tree.add_key(&group, "a.c");

    assert_eq!(modified.borrow().len(), 3);
    assert!(!tree.contains("a.b"));
    assert!(tree.item("a.c").is_some_and(|i| i.is_key()));
    assert_eq!(tree.children("a").map(|i| i.id()).collect::<Vec<_>>(), vec!["a.c", "a.x"]);

    let root = group.bundle_entry(&Locale::root(), "a.c").cloned();
    assert_eq!(
        root,
        Some(Entry::new("a.c", "Base").with_comment("# shown in header\n"))
    );
    let de = group.bundle_entry(&Locale::language("de"), "a.c").cloned();
    assert_eq!(de, Some(Entry::new("a.c", "Basis")));
    let br = group.bundle_entry(&Locale::new("pt", "BR", ""), "a.c").cloned();
    assert_eq!(br, Some(Entry::new("a.c", "Base BR").with_commented(true)));

    // Entry order inside each bundle is kept.
    let root_keys: Vec<&str> = group.bundle(&Locale::root()).map(|b| b.keys().collect()).unwrap_or_default();
    assert_eq!(root_keys, vec!["a.c", "a.x"]);
}

#[test]
fn key_operations_only_fire_for_changed_bundles() {
    let mut group = three_locales();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    group.add_listener(move |event| {
        let locale = event.payload().locale().map(Locale::to_string).unwrap_or_default();
        sink.borrow_mut().push(format!("{}:{locale}", event.kind()));
    });

    group.add_key("z");
    assert_eq!(*events.borrow(), vec!["modified:", "modified:pt_BR"]);
    events.borrow_mut().clear();

    group.remove_key("a.x");
    assert_eq!(*events.borrow(), vec!["modified:"]);
    events.borrow_mut().clear();

    group.remove_key("does.not.exist");
    group.rename_key("z", "z");
    group.uncomment_key("a.x");
    assert!(events.borrow().is_empty());

    group.comment_key("a.b");
    assert_eq!(*events.borrow(), vec!["modified:", "modified:de"]);
    events.borrow_mut().clear();

    group.copy_key("a.b", "a.copy");
    assert_eq!(events.borrow().len(), 3);
    let br = group.bundle_entry(&Locale::new("pt", "BR", ""), "a.copy").cloned();
    assert_eq!(br, Some(Entry::new("a.copy", "Base BR").with_commented(true)));
}

#[test]
fn add_bundle_merges_and_reports_removed_locales() {
    let mut group = three_locales();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    group.add_listener(move |event| sink.borrow_mut().push(event.kind()));

    let de = Locale::language("de");
    group.add_bundle(
        de.clone(),
        Bundle::with_entries([Entry::new("a.b", "Basis"), Entry::new("z", "Zett")]),
    );
    assert!(events.borrow().is_empty());

    group.add_bundle(de.clone(), Bundle::with_entries([Entry::new("a.b", "Neu")]));
    assert_eq!(*events.borrow(), vec!["modified"]);
    assert_eq!(group.keys(), vec!["a.b", "a.x"]);
    assert_eq!(group.bundle(&de).and_then(|b| b.locale()), Some(&de));

    let removed = group.remove_bundle(&de);
    assert_eq!(removed.map(|b| b.len()), Some(1));
    assert_eq!(*events.borrow(), vec!["modified", "removed"]);
    assert_eq!(group.len(), 2);
}
