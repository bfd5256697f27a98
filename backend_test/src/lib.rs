use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type, TypePath,
};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the test database is dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], and [`crate::model::mongodb::Coll<T>`], in any order.
///
/// `#[backend_test(admin)]` logs the client in as an admin, and
/// `#[backend_test(citizen)]` registers the example citizen and logs them in.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let injected = match injections(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };
    let test_args = injected.iter().map(Injection::arg).collect::<Vec<_>>();
    let collections = injected
        .iter()
        .filter_map(Injection::collection)
        .collect::<Vec<_>>();

    // The test keeps its name; the async body is renamed.
    let name = item_fn.sig.ident.clone();
    let body_name = format_ident!("{}_body", name);
    item_fn.sig.ident = body_name.clone();

    // Log in the client as an admin or a registered citizen if asked.
    let maybe_login = parse_macro_input!(args as Option<Ident>)
        .map(|arg| {
            if arg == "admin" {
                Ok(quote! {
                    crate::model::db::admin::NewAdmin::example()
                        .insert(&crate::model::mongodb::Coll::from_db(&db))
                        .await
                        .unwrap();

                    let response = rocket_client
                        .post(uri!(crate::api::admin::login))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!(crate::model::api::auth::AdminCredentials::example()).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "admin login failed");
                })
            } else if arg == "citizen" {
                Ok(quote! {
                    use crate::model::{common::Nid, db::{citizen::NewCitizen, otp::OtpRecord}};

                    NewCitizen::import(&crate::model::mongodb::Coll::from_db(&db), [NewCitizen::example()])
                        .await
                        .unwrap();

                    // Issue the OTP directly to learn the code.
                    let config = rocket_client.rocket().state::<crate::Config>().unwrap();
                    let code = OtpRecord::issue(
                        &crate::model::mongodb::Coll::from_db(&db),
                        &Nid::example(),
                        chrono::Utc::now(),
                        config,
                    )
                    .await
                    .unwrap();

                    let response = rocket_client
                        .post(uri!(crate::api::auth::verify_otp))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!({ "nid": Nid::example(), "otp": code.to_string() }).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "OTP verification failed");

                    let response = rocket_client
                        .post(uri!(crate::api::auth::register))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!(crate::model::api::auth::RegisterRequest::example()).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "registration failed");

                    let response = rocket_client
                        .post(uri!(crate::api::auth::login))
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::json!(crate::model::api::auth::LoginRequest::example()).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "citizen login failed");
                })
            } else {
                Err(syn::Error::new(arg.span(), "Expected `admin` or `citizen`"))
            }
        })
        .transpose();
    let maybe_login = match maybe_login {
        Ok(login) => login.unwrap_or_default(),
        Err(err) => return err.into_compile_error().into(),
    };

    quote! {
        #[test]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let notifier = aws_sdk_sns::Client::new(
                    &aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await,
                );
                let rocket = crate::rocket_for_db_and_notifier(db_client.clone(), &db_name, notifier);
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .expect("test server failed to ignite");
                let db = db_client.database(&db_name);

                // Login responses borrow the client, so they must be gone
                // before it is handed over.
                {
                    #maybe_login
                }

                (rocket_client, db)
            }

            #item_fn

            fn runtime(thread_name: &str) -> rocket::tokio::runtime::Runtime {
                rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name(thread_name)
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap()
            }

            // The test body gets a runtime of its own, so that a panic inside
            // it cannot take down the one that drops the database.
            let harness = runtime("test-harness");
            let (rocket_client, db) = harness.block_on(setup());

            // `Client` and the runtime are not `UnwindSafe`; smuggle them in.
            let moved = std::sync::Mutex::new((rocket_client, db.clone(), runtime("test-body")));
            let outcome = std::panic::catch_unwind(|| {
                let (rocket_client, db, body_runtime) = moved.into_inner().unwrap();
                #(#collections)*
                body_runtime.block_on(#body_name(#(#test_args),*));
            });

            harness.block_on(async move {
                db.drop(None).await.expect("failed to drop test database");
            });

            if let Err(cause) = outcome {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// One parameter of a test, and how to supply it.
enum Injection {
    Client,
    Database,
    Collection { ident: Ident, ty: Ident },
}

impl Injection {
    fn arg(&self) -> TokenStream2 {
        match self {
            Self::Client => quote! { rocket_client },
            Self::Database => quote! { db },
            Self::Collection { ident, .. } => quote! { #ident },
        }
    }

    fn collection(&self) -> Option<TokenStream2> {
        match self {
            Self::Collection { ident, ty } => Some(quote! {
                let #ident = crate::model::mongodb::Coll::<#ty>::from_db(&db);
            }),
            _ => None,
        }
    }
}

/// The `T` of a `Coll<T>` type, if that is what this is.
fn collection_type(type_path: &TypePath) -> Option<Ident> {
    let last = type_path.path.segments.last()?;
    if last.ident != "Coll" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &last.arguments else {
        return None;
    };
    match generics.args.first()? {
        GenericArgument::Type(Type::Path(inner)) => inner.path.get_ident().cloned(),
        _ => None,
    }
}

/// Check the test is async and work out what to pass for each parameter.
fn injections(sig: &Signature) -> Result<Vec<Injection>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Vec::new();
    for input in &sig.inputs {
        let unexpected = || {
            syn::Error::new(
                input.span(),
                "Expected `client: Client`, `db: Database` or `collection: Coll<T>`",
            )
        };
        let FnArg::Typed(pat_type) = input else {
            return Err(unexpected());
        };
        let (Pat::Ident(pat_ident), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) else {
            return Err(unexpected());
        };

        let injection = match type_path.path.get_ident() {
            Some(ty) if ty == "Client" => Injection::Client,
            Some(ty) if ty == "Database" => Injection::Database,
            Some(_) => return Err(unexpected()),
            None => Injection::Collection {
                ident: pat_ident.ident.clone(),
                ty: collection_type(type_path).ok_or_else(unexpected)?,
            },
        };
        let duplicate = injected.iter().any(|existing| {
            matches!(
                (existing, &injection),
                (Injection::Client, Injection::Client) | (Injection::Database, Injection::Database)
            )
        });
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot take more than one `Client` or `Database`",
            ));
        }
        injected.push(injection);
    }

    Ok(injected)
}
