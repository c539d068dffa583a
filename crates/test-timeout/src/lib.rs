//! `#[tokio_timeout_test]` and `#[timeout]`: run a test body on its own
//! thread and fail it when it outlives a wall-clock deadline.
//!
//! Arguments: a bare integer or `secs = N` sets the deadline (default 60s).
//! `paused` starts the Tokio runtime with its clock paused, so sleeps
//! auto-advance; the deadline is then enforced on the watchdog thread only.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, LitInt};

const DEFAULT_SECS: u64 = 60;

#[derive(Default)]
struct Options {
    secs: Option<u64>,
    paused: bool,
}

impl Options {
    fn secs(&self) -> u64 {
        self.secs.unwrap_or(DEFAULT_SECS)
    }

    fn parse(attr: TokenStream) -> syn::Result<Self> {
        if attr.is_empty() {
            return Ok(Self::default());
        }
        // bare `#[tokio_timeout_test(30)]`
        if let Ok(lit) = syn::parse::<LitInt>(attr.clone()) {
            return Ok(Self {
                secs: Some(positive(&lit)?),
                paused: false,
            });
        }
        let mut options = Self::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("secs") {
                let lit: LitInt = meta.value()?.parse()?;
                options.secs = Some(positive(&lit)?);
                Ok(())
            } else if meta.path.is_ident("paused") {
                options.paused = true;
                Ok(())
            } else {
                Err(meta.error("expected `secs = N` or `paused`"))
            }
        });
        parser.parse(attr)?;
        Ok(options)
    }
}

fn positive(lit: &LitInt) -> syn::Result<u64> {
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new_spanned(lit, "timeout must be greater than zero"));
    }
    Ok(secs)
}

/// Wraps `body` (an expression evaluating the test) in a watchdog thread.
fn watchdog(secs: u64, body: TokenStream2) -> TokenStream2 {
    quote! {
        let timeout_duration = std::time::Duration::from_secs(#secs);
        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| { #body }));
            let _ = sender.send(result);
        });
        match receiver.recv_timeout(timeout_duration) {
            Ok(Ok(_)) => {}
            Ok(Err(payload)) => std::panic::resume_unwind(payload),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                panic!("test timed out after {}s", #secs)
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                panic!("test thread failed before reporting result")
            }
        }
    }
}

fn strip(attrs: Vec<Attribute>, is_test: fn(&Attribute) -> bool) -> Vec<Attribute> {
    attrs.into_iter().filter(|attr| !is_test(attr)).collect()
}

fn path_is(attr: &Attribute, expected: &[&str]) -> bool {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();
    segments == expected
}

fn expand_async(options: Options, function: ItemFn) -> syn::Result<TokenStream2> {
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = function;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "tokio_timeout_test can only be applied to async functions",
        ));
    }
    sig.asyncness = None;
    let attrs = strip(attrs, |attr| path_is(attr, &["tokio", "test"]));
    let secs = options.secs();

    let builder = if options.paused {
        quote! {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
        }
    } else {
        quote! {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
        }
    };
    // a paused clock auto-advances, so an in-runtime timeout would fire early
    let run = if options.paused {
        quote! { runtime.block_on(async move #block) }
    } else {
        quote! {
            runtime.block_on(async {
                tokio::time::timeout(std::time::Duration::from_secs(#secs), async move #block)
                    .await
                    .expect("test timed out");
            })
        }
    };
    let body = watchdog(
        secs,
        quote! {
            let runtime = #builder.expect("failed to build Tokio runtime");
            #run
        },
    );

    Ok(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            #body
        }
    })
}

fn expand_sync(options: Options, function: ItemFn) -> syn::Result<TokenStream2> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = function;
    if options.paused {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "`paused` only applies to tokio_timeout_test",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "timeout attribute expects a synchronous test function",
        ));
    }
    let attrs = strip(attrs, |attr| path_is(attr, &["test"]));
    let body = watchdog(options.secs(), quote! { #block });

    Ok(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            #body
        }
    })
}

fn expand(
    attr: TokenStream,
    item: TokenStream,
    expand_with: fn(Options, ItemFn) -> syn::Result<TokenStream2>,
) -> TokenStream {
    let result = Options::parse(attr).and_then(|options| {
        let function: ItemFn = syn::parse(item)?;
        expand_with(options, function)
    });
    match result {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, expand_async)
}

#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, expand_sync)
}
