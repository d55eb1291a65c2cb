// src/utils/centroids.rs

//! Representative coordinates for the countries nextbike operates in.

/// Lowercase ISO code, latitude, longitude.
const CENTROIDS: &[(&str, f64, f64)] = &[
    ("ad", 42.5063, 1.5218),
    ("al", 41.3275, 19.8187),
    ("at", 47.5162, 14.5501),
    ("ba", 43.9159, 17.6791),
    ("be", 50.8503, 4.3517),
    ("bg", 42.7339, 25.4858),
    ("by", 53.7098, 27.9534),
    ("ch", 46.8182, 8.2275),
    ("cy", 35.1264, 33.4299),
    ("cz", 49.8175, 15.472),
    ("de", 51.1657, 10.4515),
    ("dk", 56.2639, 9.5018),
    ("ee", 58.5953, 25.0136),
    ("es", 40.4637, -3.7492),
    ("fi", 61.9241, 25.7482),
    ("fr", 46.6034, 1.8883),
    ("gb", 55.3781, -3.436),
    ("gr", 39.0742, 21.8243),
    ("hr", 45.1, 15.2),
    ("hu", 47.1625, 19.5033),
    ("ie", 53.1424, -7.6921),
    ("is", 64.9631, -19.0208),
    ("it", 41.8719, 12.5674),
    ("li", 47.166, 9.5554),
    ("lt", 55.1694, 23.8813),
    ("lu", 49.8153, 6.1296),
    ("lv", 56.8796, 24.6032),
    ("mc", 43.7384, 7.4246),
    ("md", 47.4116, 28.3699),
    ("me", 42.7087, 19.3744),
    ("mk", 41.6086, 21.7453),
    ("mt", 35.9375, 14.3754),
    ("mx", 23.6345, -102.5528),
    ("nl", 52.1326, 5.2913),
    ("no", 60.472, 8.4689),
    ("pl", 51.9194, 19.1451),
    ("pt", 39.3999, -8.2245),
    ("ro", 45.9432, 24.9668),
    ("rs", 44.0165, 21.0059),
    ("ru", 61.524, 105.3188),
    ("se", 60.1282, 18.6435),
    ("si", 46.1512, 14.9955),
    ("sk", 48.669, 19.699),
    ("sm", 43.9424, 12.4578),
    ("ua", 48.3794, 31.1656),
    ("va", 41.9029, 12.4534),
    ("xk", 42.5833, 21.0),
];

/// Look up the centroid of a country by ISO code (any case).
pub fn country_centroid(code: &str) -> Option<(f64, f64)> {
    let code = code.trim().to_ascii_lowercase();
    CENTROIDS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|&(_, lat, lng)| (lat, lng))
}
