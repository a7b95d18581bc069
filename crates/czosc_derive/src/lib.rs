extern crate quote;
extern crate syn;

extern crate proc_macro;

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Expr, LitStr, Token};
use syn::{Data, DeriveInput, Fields};

fn unwrap_attr(attrs: &[Attribute], ident: &str) -> Option<TokenStream2> {
    attrs
        .iter()
        .find(|attr| attr.path().is_ident(ident))
        .and_then(|attr| {
            if let syn::Meta::List(list) = &attr.meta {
                Some(list.tokens.clone())
            } else {
                None
            }
        })
}

/// Parsed module attribute data
struct ModuleAttr {
    name: LitStr,
    description: Option<LitStr>,
    range: Option<(Expr, Expr)>,
}

/// Module attribute syntax:
/// - #[module("name", "description")]
/// - #[module("name", "description", range = (lo, hi))]
impl Parse for ModuleAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: LitStr = input.parse()?;

        let mut description: Option<LitStr> = None;
        let mut range: Option<(Expr, Expr)> = None;

        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;

            if input.is_empty() {
                break;
            }

            if input.peek(LitStr) {
                description = Some(input.parse()?);
                continue;
            }

            let ident: Ident = input.parse()?;
            if ident == "range" {
                input.parse::<Token![=]>()?;
                let content;
                syn::parenthesized!(content in input);
                let lo: Expr = content.parse()?;
                content.parse::<Token![,]>()?;
                let hi: Expr = content.parse()?;
                range = Some((lo, hi));
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("Unknown module attribute '{}'. Expected 'range'", ident),
                ));
            }
        }

        Ok(ModuleAttr {
            name,
            description,
            range,
        })
    }
}

fn parse_module_attr(attrs: &[Attribute]) -> syn::Result<ModuleAttr> {
    let tokens = unwrap_attr(attrs, "module").ok_or_else(|| {
        syn::Error::new(Span::call_site(), "Missing #[module(...)] attribute")
    })?;
    syn::parse2::<ModuleAttr>(tokens)
}

#[proc_macro_derive(Module, attributes(module))]
pub fn module_macro_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error().into(),
    };

    match impl_module_macro(&ast) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Fields every oscillator module struct must carry.
const REQUIRED_FIELDS: [&str; 3] = ["id", "params", "outputs"];

fn check_fields(ast: &DeriveInput) -> syn::Result<()> {
    let fields = match ast.data {
        Data::Struct(ref data) => match data.fields {
            Fields::Named(ref fields) => fields,
            Fields::Unnamed(_) | Fields::Unit => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "Module can only be derived for structs with named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Module can only be derived for structs",
            ));
        }
    };

    for required in REQUIRED_FIELDS {
        let found = fields
            .named
            .iter()
            .any(|f| f.ident.as_ref().map(|i| i == required).unwrap_or(false));
        if !found {
            return Err(syn::Error::new(
                Span::call_site(),
                format!("#[derive(Module)] requires a field named `{}`", required),
            ));
        }
    }
    Ok(())
}

fn impl_module_macro(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    check_fields(ast)?;

    let name = &ast.ident;
    let module_attr = parse_module_attr(&ast.attrs)?;
    let module_name = module_attr.name;
    let module_description = module_attr
        .description
        .unwrap_or_else(|| LitStr::new("", Span::call_site()));
    let (min_value, max_value) = match module_attr.range {
        Some((lo, hi)) => (quote! { (#lo) as f32 }, quote! { (#hi) as f32 }),
        None => (quote! { -5.0f32 }, quote! { 5.0f32 }),
    };

    let constructor_name = format_ident!("{}Constructor", name)
        .to_string()
        .to_case(Case::Snake);
    let constructor_name = Ident::new(&constructor_name, Span::call_site());
    let params_struct_name = format_ident!("{}Params", name);

    Ok(quote! {
        impl crate::types::Sampleable for #name {
            fn get_id(&self) -> &str {
                &self.id
            }

            fn get_module_type(&self) -> &'static str {
                #module_name
            }

            fn process(
                &mut self,
                inputs: &crate::types::ControlInputs,
                sample_time: f32,
            ) -> &crate::poly::PolyOutput {
                self.update(inputs, sample_time);
                &self.outputs
            }

            fn output(&self) -> &crate::poly::PolyOutput {
                &self.outputs
            }

            fn try_update_params(&mut self, params: serde_json::Value) -> crate::types::Result<()> {
                self.params = serde_json::from_value(params).map_err(|source| {
                    crate::types::Error::InvalidParams {
                        module_type: #module_name.to_string(),
                        source,
                    }
                })?;
                Ok(())
            }

            fn reset(&mut self) {
                self.on_reset();
            }
        }

        fn #constructor_name(
            id: &str,
            table: std::sync::Arc<crate::dsp::blep::MinBlepTable>,
        ) -> Box<dyn crate::types::Sampleable> {
            Box::new(#name::new(id, table))
        }

        impl crate::types::Module for #name {
            fn install_constructor(map: &mut std::collections::HashMap<String, crate::types::SampleableConstructor>) {
                map.insert(#module_name.into(), #constructor_name as crate::types::SampleableConstructor);
            }

            fn install_params_validator(map: &mut std::collections::HashMap<String, crate::types::ParamsValidator>) {
                map.insert(#module_name.into(), Self::validate_params_json as crate::types::ParamsValidator);
            }

            fn validate_params_json(params: &serde_json::Value) -> crate::types::Result<()> {
                let _parsed: #params_struct_name = serde_json::from_value(params.clone()).map_err(|source| {
                    crate::types::Error::InvalidParams {
                        module_type: #module_name.to_string(),
                        source,
                    }
                })?;
                Ok(())
            }

            fn get_schema() -> crate::types::ModuleSchema {
                crate::types::ModuleSchema {
                    name: #module_name.to_string(),
                    description: #module_description.to_string(),
                    params_schema: schemars::schema_for!(#params_struct_name),
                    inputs_schema: schemars::schema_for!(crate::types::ControlInputs),
                    outputs: vec![crate::types::OutputSchema {
                        name: "output".to_string(),
                        description: "signal output".to_string(),
                        min_value: #min_value,
                        max_value: #max_value,
                    }],
                }
            }
        }
    })
}
