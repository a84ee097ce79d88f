// Copyright (C) Microsoft Corporation. All rights reserved.

//! Implementation of `test_with_tracing::test`.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Nothing;
use syn::parse_macro_input;
use syn::parse_quote;
use syn::ItemFn;
use syn::Stmt;

/// Marks a function as a test and initializes `tracing` before its body runs.
///
/// The function keeps its signature, so tests returning `Result` work as
/// with the built-in attribute.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    parse_macro_input!(attr as Nothing);
    let mut func = parse_macro_input!(item as ItemFn);

    let init: Stmt = parse_quote!(::test_with_tracing::init(););
    func.block.stmts.insert(0, init);

    let expanded: proc_macro2::TokenStream = quote! {
        #[::core::prelude::v1::test]
        #func
    };
    expanded.into()
}
