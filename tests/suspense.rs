mod common;

use cambium::{component, element, fragment, lazy, suspense, text, ComponentError, Module, Props, Root, Scratch};
use common::{init_tracing, suspended, Catcher, CustomSuspense, WrapperOne};
use std::{cell::Cell, rc::Rc};

struct LazyComp;
impl cambium::Component for LazyComp {
	fn render(&self, _: &mut cambium::RenderContext<'_>) -> cambium::Render {
		Ok(element("div", vec![text("Hello from LazyComp")]))
	}
}

#[test]
fn suspends_when_using_lazy() {
	init_tracing();
	let resolver = Rc::new(Cell::new(None));
	let lazy_comp = lazy({
		let resolver = resolver.clone();
		move || {
			let (module, settle) = cambium::deferred();
			resolver.set(Some(settle));
			module
		}
	});

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(lazy_comp.descriptor(Props::new(), None), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");
	assert_eq!(root.pending_boundaries(), 1);

	resolver.take().unwrap().resolve(Module { default: Rc::new(LazyComp) });
	assert_eq!(root.rerender().unwrap(), 1);
	assert_eq!(root.surface().inner_html(), "<div>Hello from LazyComp</div>");
	assert_eq!(root.pending_boundaries(), 0);
}

#[test]
fn suspends_when_a_signal_is_thrown() {
	init_tracing();
	let (custom, settler) = CustomSuspense::new("regular case");

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(WrapperOne, vec![component(custom, None)]), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	settler.resolve();
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Hello from CustomSuspense regular case</div>");
}

#[test]
fn suspends_within_custom_error_boundary() {
	init_tracing();
	let (custom, settler) = CustomSuspense::new("within error boundary");

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(Catcher, vec![component(custom, None)]), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	settler.resolve();
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Hello from CustomSuspense within error boundary</div>");
}

#[test]
fn failed_suspension_is_caught_inside() {
	init_tracing();
	let (custom, settler) = CustomSuspense::new("throwing");

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(Catcher, vec![component(custom, None)]), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	settler.reject(ComponentError::new("Thrown in suspense"));
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Catcher did catch: Thrown in suspense</div>");
}

#[test]
fn renders_multiple_suspending_components_in_one_go() {
	init_tracing();
	let renders = Rc::new(Cell::new(0));
	let (first, first_settler) = CustomSuspense::counted("first", &renders);
	let (second, second_settler) = CustomSuspense::counted("second", &renders);

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(Catcher, vec![component(first, None), component(second, None)]), suspended())).unwrap();
	assert_eq!(renders.get(), 2);
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");
	assert_eq!(root.pending_signal_count(), 2);

	first_settler.resolve();
	second_settler.resolve();
	assert_eq!(root.rerender().unwrap(), 1);
	assert_eq!(
		root.surface().inner_html(),
		"<div>Hello from CustomSuspense first</div><div>Hello from CustomSuspense second</div>"
	);
	assert_eq!(renders.get(), 4);
}

#[test]
fn renders_multiple_nested_suspending_components_in_one_go() {
	init_tracing();
	let renders = Rc::new(Cell::new(0));
	let (first, first_settler) = CustomSuspense::counted("first", &renders);
	let (second, second_settler) = CustomSuspense::counted("second", &renders);

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(
		component(Catcher, vec![component(first, None), element("div", vec![component(second, None)])]),
		suspended(),
	))
	.unwrap();
	assert_eq!(renders.get(), 2);
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	first_settler.resolve();
	second_settler.resolve();
	root.rerender().unwrap();
	assert_eq!(
		root.surface().inner_html(),
		"<div>Hello from CustomSuspense first</div><div><div>Hello from CustomSuspense second</div></div>"
	);
}

#[test]
fn suspends_when_nested_in_a_fragment() {
	init_tracing();
	let (custom, settler) = CustomSuspense::new("nested in a Fragment");

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(Catcher, vec![fragment(vec![component(custom, None)])]), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	settler.resolve();
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Hello from CustomSuspense nested in a Fragment</div>");
}

#[test]
fn only_the_innermost_suspense_suspends() {
	init_tracing();
	let (custom, settler) = CustomSuspense::new("1");

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(
		fragment(vec![
			text("Not suspended..."),
			suspense(component(Catcher, vec![component(custom, None)]), element("div", vec![text("Suspended... 2")])),
		]),
		element("div", vec![text("Suspended... 1")]),
	))
	.unwrap();
	assert_eq!(root.surface().inner_html(), "Not suspended...<div>Suspended... 2</div>");

	settler.resolve();
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "Not suspended...<div>Hello from CustomSuspense 1</div>");
}

#[test]
fn missing_suspense_is_an_error() {
	init_tracing();
	let (custom, _settler) = CustomSuspense::new("1");

	let mut root = Root::new(Scratch::new());
	root.render(&component(Catcher, vec![component(custom, None)])).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Catcher did catch: Missing Suspense</div>");
	assert_eq!(root.pending_boundaries(), 0);
}

#[test]
fn lazy_loader_failure_is_caught() {
	init_tracing();
	let resolver = Rc::new(Cell::new(None));
	let throwing_lazy = lazy({
		let resolver = resolver.clone();
		move || {
			let (module, settle) = cambium::deferred::<Module>();
			resolver.set(Some(settle));
			module
		}
	});

	let mut root = Root::new(Scratch::new());
	root.render(&suspense(component(Catcher, vec![throwing_lazy.descriptor(Props::new(), None)]), suspended())).unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Suspended...</div>");

	resolver.take().unwrap().reject(ComponentError::new("Thrown in lazy's loader..."));
	root.rerender().unwrap();
	assert_eq!(root.surface().inner_html(), "<div>Catcher did catch: Thrown in lazy's loader...</div>");
}
