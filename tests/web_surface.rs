#![cfg(all(target_arch = "wasm32", feature = "web"))]

use cambium::{element, pending, suspense, text, web::DomSurface, Component, Descriptor, PendingSignal, Render, RenderContext, Root};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement};

wasm_bindgen_test_configure!(run_in_browser);

struct Greeting(PendingSignal);
impl Component for Greeting {
	fn render(&self, _: &mut RenderContext<'_>) -> Render {
		self.0.check()?;
		Ok(element("p", vec![text("Hello cambium!")]).with_attribute("class", "greeting"))
	}
}

fn body() -> web_sys::Element {
	let _ = tracing_wasm::try_set_as_global_default();
	window()
		.unwrap()
		.document()
		.unwrap()
		.body()
		.unwrap()
		.dyn_into::<HtmlBodyElement>()
		.unwrap()
		.into()
}

#[wasm_bindgen_test]
fn create_diff_remove() {
	let body = body();
	body.set_inner_html("");
	let mut root = Root::new(DomSurface::new_for_element_child_nodes(body.clone()));

	root.render(&element("div", vec![text("first")])).unwrap();
	assert_eq!(body.inner_html(), "<div>first</div>");

	root.render(&element("div", vec![text("second")]).with_attribute("id", "x")).unwrap();
	assert_eq!(body.inner_html(), r#"<div id="x">second</div>"#);

	root.render(&text("gone")).unwrap();
	assert_eq!(body.inner_html(), "gone");

	root.render(&Descriptor::from(String::new())).unwrap();
	assert_eq!(body.inner_html(), "");
}

#[wasm_bindgen_test]
fn suspense_swaps_fallback() {
	let body = body();
	body.set_inner_html("");
	let (signal, settler) = pending();
	let mut root = Root::new(DomSurface::new_for_element_child_nodes(body.clone()));

	root.render(&suspense(cambium::component(Greeting(signal), None), element("i", vec![text("Loading...")]))).unwrap();
	assert_eq!(body.inner_html(), "<i>Loading...</i>");

	settler.resolve();
	assert_eq!(root.rerender().unwrap(), 1);
	assert_eq!(body.inner_html(), r#"<p class="greeting">Hello cambium!</p>"#);
}

#[wasm_bindgen_test]
fn loads_existing_content() {
	let body = body();
	body.set_inner_html("<b>old</b>");
	let mut root = Root::new(DomSurface::new_for_element_child_nodes(body.clone()));

	root.render(&element("b", vec![text("new")])).unwrap();
	assert_eq!(body.inner_html(), "<b>new</b>");
}
