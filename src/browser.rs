use anyhow::{anyhow, Result};
use futures::Future;
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, Storage, Window,
};

const CANVAS_ID: &str = "canvas";
const UI_ID: &str = "ui";

macro_rules! log {
    ( $( $t:tt )* ) => {
        $crate::browser::log_line(&format!( $( $t )* ))
    }
}

macro_rules! error {
    ( $( $t:tt )* ) => {
        $crate::browser::error_line(&format!( $( $t )* ))
    }
}

#[cfg(target_arch = "wasm32")]
pub fn log_line(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_line(message: &str) {
    println!("{}", message);
}

#[cfg(target_arch = "wasm32")]
pub fn error_line(message: &str) {
    web_sys::console::error_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error_line(message: &str) {
    eprintln!("{}", message);
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("No Window Found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID '{}'", CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

/// Keyboard handlers live on the canvas, so it needs focus to see any keys.
pub fn focus_canvas() -> Result<()> {
    canvas()?
        .focus()
        .map_err(|err| anyhow!("Could not set focus to canvas! {:#?}", err))
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    canvas()?
        .get_context("2d")
        .map_err(|js_value| anyhow!("Error getting 2d context {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

pub fn local_storage() -> Result<Storage> {
    window()?
        .local_storage()
        .map_err(|js_value| anyhow!("Error accessing localStorage {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No localStorage available"))
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame {:#?}", err))
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f))
}

pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

/// Sets the text of the element with `id`, if the page has one.
pub fn set_text(id: &str, text: &str) -> Result<()> {
    if let Some(element) = document()?.get_element_by_id(id) {
        element.set_text_content(Some(text));
    }
    Ok(())
}

pub fn draw_ui(html: &str) -> Result<()> {
    find_ui()?
        .insert_adjacent_html("afterbegin", html)
        .map_err(|err| anyhow!("Could not insert html {:#?}", err))
}

pub fn hide_ui() -> Result<()> {
    let ui = find_ui()?;

    if let Some(child) = ui.first_child() {
        ui.remove_child(&child)
            .map(|_removed_child| ())
            .map_err(|err| anyhow!("Failed to remove child {:#?}", err))
            .and_then(|_unit| focus_canvas())
    } else {
        Ok(())
    }
}

pub fn find_html_element_by_id(id: &str) -> Result<HtmlElement> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("Element with id {} not found", id))?
        .dyn_into::<HtmlElement>()
        .map_err(|err| anyhow!("Could not cast into HtmlElement {:#?}", err))
}

fn find_ui() -> Result<Element> {
    document().and_then(|doc| {
        doc.get_element_by_id(UI_ID)
            .ok_or_else(|| anyhow!("UI element not found"))
    })
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn performance_clock_moves_forward() {
        let first = now().expect("performance.now");
        let second = now().expect("performance.now");

        assert!(second >= first);
    }

    #[wasm_bindgen_test]
    fn focus_canvas_moves_keyboard_focus_to_the_canvas() {
        let document = document().expect("document");
        if document.get_element_by_id(CANVAS_ID).is_none() {
            let canvas = document.create_element("canvas").expect("create canvas");
            canvas.set_id(CANVAS_ID);
            canvas.set_attribute("tabindex", "0").expect("tabindex");
            document
                .body()
                .expect("body")
                .append_child(&canvas)
                .expect("append canvas");
        }

        focus_canvas().expect("focus");

        let focused = document.active_element().map(|element| element.id());
        assert_eq!(focused.as_deref(), Some(CANVAS_ID));
    }

    #[wasm_bindgen_test]
    fn set_text_ignores_missing_elements() {
        assert!(set_text("no-such-element", "hello").is_ok());
    }
}
