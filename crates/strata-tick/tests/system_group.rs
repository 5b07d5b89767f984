//! Scheduling order, replacement and nesting of system groups.

use std::cell::RefCell;

use strata_ecs::Registry;
use strata_tick::{System, SystemGroup};

/// Context that records which systems ran.
#[derive(Default)]
struct Trace(RefCell<Vec<&'static str>>);

impl Trace {
    fn push(&self, name: &'static str) {
        self.0.borrow_mut().push(name);
    }

    fn take(&self) -> Vec<&'static str> {
        self.0.take()
    }
}

macro_rules! tracer {
    ($name:ident) => {
        #[derive(Default)]
        struct $name {
            runs: u32,
        }

        impl System<Trace> for $name {
            fn update(&mut self, _: &Registry, trace: &Trace) {
                self.runs += 1;
                trace.push(stringify!($name));
            }
        }
    };
}

tracer!(Input);
tracer!(Integrate);
tracer!(Collide);
tracer!(Report);

struct Counter {
    seen: usize,
}

impl System<Trace> for Counter {
    fn update(&mut self, registry: &Registry, trace: &Trace) {
        self.seen = registry.view::<(u32,)>().count();
        trace.push("Counter");
    }
}

#[test]
fn runs_in_ascending_order() {
    let registry = Registry::new();
    let trace = Trace::default();
    let mut group: SystemGroup<Trace> = SystemGroup::new();

    group.attach(10, Report::default());
    group.attach(-5, Input::default());
    group.attach(0, Integrate::default());

    group.update(&registry, &trace);

    assert_eq!(trace.take(), vec!["Input", "Integrate", "Report"]);
}

#[test]
fn equal_orders_run_in_insertion_order() {
    let registry = Registry::new();
    let trace = Trace::default();
    let mut group: SystemGroup<Trace> = SystemGroup::new();

    group.attach(1, Collide::default());
    group.attach(1, Input::default());
    group.attach(1, Report::default());
    group.attach(0, Integrate::default());

    group.update(&registry, &trace);
    group.update(&registry, &trace);

    assert_eq!(
        trace.take(),
        vec!["Integrate", "Collide", "Input", "Report", "Integrate", "Collide", "Input", "Report"]
    );
}

#[test]
fn attach_replaces_same_type() {
    let mut group: SystemGroup<Trace> = SystemGroup::new();

    group.attach(0, Input { runs: 3 });
    let replaced = group.attach(7, Input { runs: 9 });
    replaced.runs += 1;

    assert_eq!(group.len(), 1);
    assert_eq!(group.find::<Input>().map(|s| s.runs), Some(10));
    assert_eq!(group.order_of::<Input>(), Some(7));
}

#[test]
fn find_detach_and_clear() {
    let registry = Registry::new();
    let trace = Trace::default();
    let mut group: SystemGroup<Trace> = SystemGroup::new();

    group.attach_default::<Input>();
    group.attach_default::<Report>();

    group.update(&registry, &trace);
    assert_eq!(group.find::<Input>().map(|s| s.runs), Some(1));

    if let Some(report) = group.find_mut::<Report>() {
        report.runs = 100;
    }
    assert_eq!(group.find::<Report>().map(|s| s.runs), Some(100));

    assert!(group.detach::<Input>());
    assert!(!group.detach::<Input>());
    assert!(!group.attached::<Input>());
    assert!(group.find::<Input>().is_none());

    group.clear();
    assert!(group.is_empty());
}

#[test]
fn reorder_moves_entry() {
    let registry = Registry::new();
    let trace = Trace::default();
    let mut group: SystemGroup<Trace> = SystemGroup::new();

    group.attach(0, Input::default());
    group.attach(1, Report::default());

    assert!(group.reorder::<Input>(2));
    assert!(!group.reorder::<Collide>(0));
    assert_eq!(group.order_of::<Input>(), Some(2));

    group.update(&registry, &trace);
    assert_eq!(trace.take(), vec!["Report", "Input"]);
}

#[test]
fn nested_groups_update_depth_first() {
    let registry = Registry::new();
    let trace = Trace::default();

    let mut physics: SystemGroup<Trace> = SystemGroup::new();
    physics.attach(1, Collide::default());
    physics.attach(0, Integrate::default());

    let mut root: SystemGroup<Trace> = SystemGroup::new();
    root.attach(10, Report::default());
    root.attach(-10, Input::default());
    root.attach(0, physics);

    root.update(&registry, &trace);

    assert_eq!(trace.take(), vec!["Input", "Integrate", "Collide", "Report"]);

    let inner = root.find_mut::<SystemGroup<Trace>>();
    assert!(inner.is_some_and(|group| group.detach::<Collide>()));

    root.update(&registry, &trace);
    assert_eq!(trace.take(), vec!["Input", "Integrate", "Report"]);
}

#[test]
fn systems_read_the_registry() {
    let mut registry = Registry::new();
    registry.spawn((1_u32,));
    registry.spawn((2_u32, 0.5_f32));
    registry.spawn((0.5_f32,));

    let trace = Trace::default();
    let mut group: SystemGroup<Trace> = SystemGroup::new();
    group.attach(0, Counter { seen: 0 });

    group.update(&registry, &trace);

    assert_eq!(group.find::<Counter>().map(|c| c.seen), Some(2));
}

#[test]
fn schedule_lists_run_order() {
    let mut group: SystemGroup<Trace> = SystemGroup::new();
    group.attach(2, Report::default());
    group.attach(1, Input::default());

    let names = group.schedule();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("Input"));
    assert!(names[1].ends_with("Report"));
}
