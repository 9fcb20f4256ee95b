use crate::bundle::CompileOptions;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn compile_ast_json_to_sb3(source: &str) -> Result<Vec<u8>, JsValue> {
    compile_ast_json_to_sb3_for_sprite(source, None)
}

#[wasm_bindgen]
pub fn compile_ast_json_to_sb3_for_sprite(
    source: &str,
    sprite: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    crate::compile_ast_json_to_sb3_bytes(source, &CompileOptions { sprite })
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
